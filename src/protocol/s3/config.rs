//! Configuration types for the S3 client

use super::error::{S3Error, S3Result};
use serde::{Deserialize, Serialize};

/// Client options that do not come from the resource URI
///
/// The bucket is never configured here: it is always taken from the URI host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3ClientOptions {
    /// AWS region (e.g., "us-east-1"); falls back to the provider chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint URL (for S3-compatible services like MinIO)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Path-style addressing (required for some S3-compatible services)
    #[serde(default)]
    pub force_path_style: bool,

    /// Operation timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    super::DEFAULT_TIMEOUT_SECONDS
}

impl Default for S3ClientOptions {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            force_path_style: false,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl S3ClientOptions {
    /// Set the AWS region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set custom endpoint (for MinIO, LocalStack, etc.)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Force path-style addressing
    pub fn with_path_style(mut self) -> Self {
        self.force_path_style = true;
        self
    }

    /// Validate the options
    pub fn validate(&self) -> S3Result<()> {
        if self.timeout_seconds == 0 {
            return Err(S3Error::InvalidConfig(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            if url::Url::parse(endpoint).is_err() {
                return Err(S3Error::InvalidConfig(format!(
                    "Endpoint is not a valid URL: {}",
                    endpoint
                )));
            }
        }

        if matches!(&self.region, Some(r) if r.trim().is_empty()) {
            return Err(S3Error::InvalidConfig("Region cannot be blank".to_string()));
        }

        Ok(())
    }

    /// Check if using custom endpoint (S3-compatible service)
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = S3ClientOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.timeout_seconds, 300);
        assert!(!options.is_custom_endpoint());
    }

    #[test]
    fn test_builder_methods() {
        let options = S3ClientOptions::default()
            .with_region("eu-west-1")
            .with_endpoint("http://localhost:9000")
            .with_path_style();

        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert!(options.is_custom_endpoint());
        assert!(options.force_path_style);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        let options = S3ClientOptions::default().with_endpoint("not a url");
        assert!(matches!(options.validate(), Err(S3Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let options = S3ClientOptions {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_toml_defaults() {
        let options: S3ClientOptions = toml::from_str("region = \"us-west-2\"").unwrap();
        assert_eq!(options.region.as_deref(), Some("us-west-2"));
        assert_eq!(options.timeout_seconds, 300);
        assert!(!options.force_path_style);
    }
}
