/*!
 * Mapping of resource URIs onto bucket/key pairs
 */

use super::error::{S3Error, S3Result};
use url::Url;

/// Bucket and key derived from a resource URI
///
/// Every S3 operation goes through [`ResourceLocation::from_uri`]: the host is
/// the bucket and the path, minus one leading `/`, is the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub bucket: String,
    pub key: String,
}

impl ResourceLocation {
    pub fn from_uri(uri: &Url) -> S3Result<Self> {
        let bucket = bucket_name(uri)?;
        Ok(Self {
            bucket,
            key: bucket_key(uri),
        })
    }
}

/// Bucket name: the URI host
pub fn bucket_name(uri: &Url) -> S3Result<String> {
    match uri.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(S3Error::InvalidLocation(format!(
            "{} has no bucket (host) segment",
            uri
        ))),
    }
}

/// Object key: the decoded URI path with a single leading `/` removed
pub fn bucket_key(uri: &Url) -> String {
    let raw = uri.path();
    let path = urlencoding::decode(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    match path.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_bucket_and_key() {
        let location = ResourceLocation::from_uri(&url("s3://my-bucket/path/to/file.txt")).unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.key, "path/to/file.txt");
    }

    #[test]
    fn test_key_never_has_leading_slash() {
        for uri in [
            "s3://bucket/a.jar",
            "s3://bucket/repo/",
            "s3://bucket/",
            "s3://bucket",
            "s3://bucket/deep/nested/path/x.pom",
        ] {
            let key = bucket_key(&url(uri));
            assert!(!key.starts_with('/'), "{} produced key {}", uri, key);
        }
    }

    #[test]
    fn test_only_one_leading_slash_removed() {
        assert_eq!(bucket_key(&url("s3://bucket//double/a.txt")), "/double/a.txt");
    }

    #[test]
    fn test_bucket_only() {
        let location = ResourceLocation::from_uri(&url("s3://my-bucket")).unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.key, "");
    }

    #[test]
    fn test_percent_encoded_key_is_decoded() {
        let location = ResourceLocation::from_uri(&url("s3://bucket/my%20dir/a%2Bb.txt")).unwrap();
        assert_eq!(location.key, "my dir/a+b.txt");
    }

    #[test]
    fn test_missing_bucket_rejected() {
        let result = ResourceLocation::from_uri(&url("s3:///path/only"));
        assert!(matches!(result, Err(S3Error::InvalidLocation(_))));
    }

    #[test]
    fn test_prefix_location_keeps_trailing_slash() {
        assert_eq!(bucket_key(&url("s3://bucket/releases/")), "releases/");
    }
}
