/*!
 * Configuration types for orbit-wagon
 */

use crate::credentials::{AwsCredentials, Credentials};
use crate::error::{Result, TransportError};
use crate::protocol::s3::S3ClientOptions;
use crate::repository::ArtifactRepository;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration for the wagon binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WagonConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Path to log file (None = stdout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for debug level)
    #[serde(default)]
    pub verbose: bool,

    /// Repository the wagon connects to
    pub repository: RepositoryConfig,

    /// Object store client options
    #[serde(default)]
    pub s3: S3ClientOptions,
}

/// Repository section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository name, also used as the transport name
    pub name: String,

    /// Base URL, e.g. `s3://bucket/releases`
    pub url: String,

    /// Credential override; the default AWS provider chain applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl WagonConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TransportError::configuration_with(
                format!("Failed to read config file {}", path.display()),
                e,
            )
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: WagonConfig = toml::from_str(contents)
            .map_err(|e| TransportError::configuration_with("Invalid config file", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TransportError::configuration_with("Failed to serialize config", e))?;
        std::fs::write(path, contents).map_err(|e| TransportError::io(path.display(), e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.repository.name.trim().is_empty() {
            return Err(TransportError::configuration(
                "repository.name cannot be empty",
            ));
        }

        let url = self.repository_url()?;
        if url.host_str().is_none() {
            return Err(TransportError::configuration(format!(
                "repository.url has no bucket: {}",
                url
            )));
        }

        if let Some(Credentials::AccessKeyPair(aws)) = &self.repository.credentials {
            if aws.is_partial() {
                return Err(TransportError::configuration(
                    "repository.credentials needs both access_key and secret_key",
                ));
            }
        }

        self.s3
            .validate()
            .map_err(|e| TransportError::configuration_with("Invalid [s3] section", e))
    }

    fn repository_url(&self) -> Result<Url> {
        Url::parse(&self.repository.url).map_err(|e| {
            TransportError::configuration_with(
                format!("repository.url is not a valid URL: {}", self.repository.url),
                e,
            )
        })
    }

    /// Repository described by the `[repository]` section
    pub fn artifact_repository(&self) -> Result<ArtifactRepository> {
        let credentials = self
            .repository
            .credentials
            .clone()
            .unwrap_or_else(|| Credentials::AccessKeyPair(AwsCredentials::default()));
        Ok(ArtifactRepository::new(
            self.repository.name.clone(),
            self.repository_url()?,
            credentials,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const EXAMPLE: &str = r#"
log_level = "debug"
log_file = "/var/log/orbit-wagon.log"

[repository]
name = "releases"
url = "s3://artifacts/releases"

[repository.credentials]
type = "access_key_pair"
access_key = "AKIAEXAMPLE"
secret_key = "secret"

[s3]
region = "eu-west-1"
endpoint = "http://localhost:9000"
force_path_style = true
"#;

    #[test]
    fn test_example_config_parses() {
        let config = WagonConfig::from_toml_str(EXAMPLE).unwrap();

        assert_eq!(config.repository.name, "releases");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.log_file,
            Some(PathBuf::from("/var/log/orbit-wagon.log"))
        );
        assert_eq!(config.s3.region.as_deref(), Some("eu-west-1"));
        assert!(config.s3.force_path_style);
        assert_eq!(config.s3.timeout_seconds, 300);
        assert_eq!(
            config.repository.credentials,
            Some(AwsCredentials::new("AKIAEXAMPLE", "secret").into())
        );

        let repository = config.artifact_repository().unwrap();
        assert_eq!(repository.protocol(), "s3");
        assert_eq!(repository.name(), "releases");
    }

    #[test]
    fn test_missing_credentials_use_provider_chain() {
        let config = WagonConfig::from_toml_str(
            r#"
[repository]
name = "snapshots"
url = "s3://artifacts/snapshots"
"#,
        )
        .unwrap();

        let repository = config.artifact_repository().unwrap();
        assert_eq!(
            repository.credentials(),
            &Credentials::AccessKeyPair(AwsCredentials::default())
        );
        assert!(!config.verbose);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_validation_failures() {
        let blank_name = r#"
[repository]
name = " "
url = "s3://artifacts/releases"
"#;
        let bad_url = r#"
[repository]
name = "releases"
url = "not a url"
"#;
        let partial_pair = r#"
[repository]
name = "releases"
url = "s3://artifacts/releases"

[repository.credentials]
type = "access_key_pair"
access_key = "AKIAEXAMPLE"
"#;
        let zero_timeout = r#"
[repository]
name = "releases"
url = "s3://artifacts/releases"

[s3]
timeout_seconds = 0
"#;

        for doc in [blank_name, bad_url, partial_pair, zero_timeout] {
            let err = WagonConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, TransportError::Configuration { .. }), "{doc}");
        }
    }

    #[test]
    fn test_round_trip_through_file() {
        let config = WagonConfig::from_toml_str(EXAMPLE).unwrap();
        let file = NamedTempFile::new().unwrap();

        config.to_file(file.path()).unwrap();
        let loaded = WagonConfig::from_file(file.path()).unwrap();

        assert_eq!(loaded.repository, config.repository);
        assert_eq!(loaded.s3, config.s3);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = WagonConfig::from_file(Path::new("/nonexistent/orbit-wagon.toml")).unwrap_err();
        assert!(matches!(err, TransportError::Configuration { .. }));
    }
}
