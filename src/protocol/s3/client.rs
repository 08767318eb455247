//! S3 client implementation

use super::config::S3ClientOptions;
use super::error::{S3Error, S3Result};
use super::store::ObjectStore;
use super::types::{BoxedReader, ListRequest, ObjectMetadata, StoredObject};
use super::uri::ResourceLocation;
use crate::credentials::AwsCredentials;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client as AwsS3Client;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Final path segment of a key
static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^/]+\.*$").unwrap());

/// Region used when neither the options nor the environment name one
const FALLBACK_REGION: &str = "us-east-1";

/// Name the static credentials are registered under in the provider chain
const STATIC_PROVIDER_NAME: &str = "orbit-wagon-static";

/// Object store client addressed by resource URI
///
/// Owns the store handle for the lifetime of a transport. All four operations
/// derive the bucket and key from the URI through [`ResourceLocation`]. SDK
/// errors are returned as-is; classification happens in the connector.
#[derive(Clone)]
pub struct S3Client {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client").finish_non_exhaustive()
    }
}

impl S3Client {
    /// Wrap an already-built store (used for tests and custom integrations)
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Wrap an already-configured AWS SDK client
    pub fn from_sdk_client(client: AwsS3Client) -> Self {
        Self::from_store(Arc::new(client))
    }

    /// Build a new SDK client from a key pair and client options
    ///
    /// When both keys are present they are tried first, ahead of the default
    /// provider chain (environment, profile, instance metadata). When neither
    /// is present the default chain alone is used.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use orbit_wagon::credentials::AwsCredentials;
    /// use orbit_wagon::protocol::s3::{S3Client, S3ClientOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let credentials = AwsCredentials::new("AKIA...", "secret");
    ///     let client = S3Client::new(&credentials, &S3ClientOptions::default()).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(credentials: &AwsCredentials, options: &S3ClientOptions) -> S3Result<Self> {
        options.validate()?;
        let client = Self::build_aws_client(credentials, options).await?;
        Ok(Self::from_sdk_client(client))
    }

    async fn build_aws_client(
        credentials: &AwsCredentials,
        options: &S3ClientOptions,
    ) -> S3Result<AwsS3Client> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = match &options.region {
            Some(region) => RegionProviderChain::first_try(Region::new(region.clone()))
                .or_default_provider()
                .or_else(Region::new(FALLBACK_REGION)),
            None => RegionProviderChain::default_provider().or_else(Region::new(FALLBACK_REGION)),
        };
        loader = loader.region(region_provider);

        match (credentials.access_key(), credentials.secret_key()) {
            (Some(access_key), Some(secret_key)) => {
                let chain = CredentialsProviderChain::first_try(
                    STATIC_PROVIDER_NAME,
                    Credentials::new(access_key, secret_key, None, None, STATIC_PROVIDER_NAME),
                )
                .or_default_provider()
                .await;
                loader = loader.credentials_provider(chain);
            }
            (None, None) => {
                debug!("No explicit AWS keys configured, using the default provider chain");
            }
            _ => {
                return Err(S3Error::InvalidConfig(
                    "Both access key and secret key must be set, or neither".to_string(),
                ));
            }
        }

        let aws_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &options.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if options.force_path_style {
            builder = builder.force_path_style(true);
        }

        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(options.timeout_seconds))
            .build();
        builder = builder.timeout_config(timeout_config);

        Ok(AwsS3Client::from_conf(builder.build()))
    }

    /// Upload `stream` to `destination`, declaring `content_length` up front
    pub async fn put(
        &self,
        stream: BoxedReader,
        content_length: i64,
        destination: &Url,
    ) -> S3Result<()> {
        let location = ResourceLocation::from_uri(destination)?;
        debug!(
            "Attempting to put resource:[{}] into bucket [{}]",
            location.key, location.bucket
        );
        self.store
            .put_object(&location.bucket, &location.key, stream, content_length)
            .await
    }

    /// Head the object at `uri`
    pub async fn get_metadata(&self, uri: &Url) -> S3Result<ObjectMetadata> {
        let location = ResourceLocation::from_uri(uri)?;
        debug!(
            "Attempting to get metadata for [{}] in bucket [{}]",
            location.key, location.bucket
        );
        self.store.head_object(&location.bucket, &location.key).await
    }

    /// Open the object at `uri` without reading its body
    pub async fn get_resource(&self, uri: &Url) -> S3Result<StoredObject> {
        let location = ResourceLocation::from_uri(uri)?;
        debug!(
            "Attempting to get resource:[{}] from bucket [{}]",
            location.key, location.bucket
        );
        self.store.get_object(&location.bucket, &location.key).await
    }

    /// List the file names directly under `parent`
    ///
    /// Follows continuation tokens until the store stops reporting truncation.
    /// Names keep the order the store returned them in; names without a `.`
    /// are treated as directories and dropped.
    pub async fn list(&self, parent: &Url) -> S3Result<Vec<String>> {
        let location = ResourceLocation::from_uri(parent)?;
        debug!(
            "Attempting to list resources under [{}] in bucket [{}]",
            location.key, location.bucket
        );

        let mut results = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .store
                .list_objects(ListRequest {
                    bucket: location.bucket.clone(),
                    prefix: location.key.clone(),
                    delimiter: Some("/".to_string()),
                    continuation_token: continuation_token.take(),
                })
                .await?;

            results.extend(page.keys.iter().filter_map(|key| extract_resource_name(key)));

            if !page.is_truncated {
                break;
            }

            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => {
                    warn!(
                        "Listing of {} reported more pages without a continuation token",
                        parent
                    );
                    break;
                }
            }
        }

        Ok(results)
    }
}

/// File name of a key, or `None` for keys that look like directories
pub fn extract_resource_name(key: &str) -> Option<String> {
    FILENAME_PATTERN
        .find(key)
        .map(|m| m.as_str())
        .filter(|name| name.contains('.'))
        .map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::s3::MemoryStore;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn client_over(store: &MemoryStore) -> S3Client {
        S3Client::from_store(Arc::new(store.clone()))
    }

    #[test]
    fn test_extract_resource_name() {
        assert_eq!(extract_resource_name("a/b.txt").as_deref(), Some("b.txt"));
        assert_eq!(
            extract_resource_name("repo/org/lib-1.0.jar").as_deref(),
            Some("lib-1.0.jar")
        );
        assert_eq!(extract_resource_name("a/readme"), None);
        assert_eq!(extract_resource_name("a/sub/"), None);
        assert_eq!(extract_resource_name("top.pom").as_deref(), Some("top.pom"));
    }

    #[tokio::test]
    async fn test_list_filters_directories_and_extensionless_keys() {
        let store = MemoryStore::new();
        store.insert("bucket", "a/b.txt", "1");
        store.insert("bucket", "a/sub/", "");
        store.insert("bucket", "a/readme", "2");

        let names = client_over(&store).list(&url("s3://bucket/a/")).await.unwrap();
        assert_eq!(names, vec!["b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_list_follows_every_page() {
        let expected: Vec<String> = (0..23).map(|i| format!("artifact-{:02}.jar", i)).collect();

        for page_size in [1, 2, 5, 10, 23, 100] {
            let store = MemoryStore::new().with_page_size(page_size);
            for name in &expected {
                store.insert("bucket", &format!("libs/{}", name), "x");
            }

            let names = client_over(&store)
                .list(&url("s3://bucket/libs/"))
                .await
                .unwrap();
            assert_eq!(names, expected, "page size {}", page_size);

            let pages = 23usize.div_ceil(page_size);
            assert_eq!(store.requests().list, pages, "page size {}", page_size);
        }
    }

    #[tokio::test]
    async fn test_list_returns_only_immediate_children() {
        let store = MemoryStore::new();
        store.insert("bucket", "libs/a.jar", "1");
        store.insert("bucket", "libs/nested/b.jar", "2");

        let names = client_over(&store).list(&url("s3://bucket/libs/")).await.unwrap();
        assert_eq!(names, vec!["a.jar".to_string()]);
    }

    #[tokio::test]
    async fn test_get_metadata_missing_key_is_not_found() {
        let store = MemoryStore::new();
        store.insert("bucket", "present.jar", "x");

        let err = client_over(&store)
            .get_metadata(&url("s3://bucket/absent.jar"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = MemoryStore::new();
        let client = client_over(&store);
        let destination = url("s3://bucket/releases/app-1.0.jar");
        let bytes = b"artifact bytes".to_vec();

        client
            .put(
                Box::new(Cursor::new(bytes.clone())),
                bytes.len() as i64,
                &destination,
            )
            .await
            .unwrap();

        let mut object = client.get_resource(&destination).await.unwrap();
        assert_eq!(object.metadata.content_length, bytes.len() as i64);

        let mut fetched = Vec::new();
        object.body.read_to_end(&mut fetched).await.unwrap();
        assert_eq!(fetched, bytes);
        assert_eq!(
            store.object("bucket", "releases/app-1.0.jar").unwrap().as_ref(),
            bytes.as_slice()
        );
    }

    #[tokio::test]
    async fn test_errors_propagate_unclassified() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let err = client_over(&store)
            .list(&url("s3://bucket/"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::Network(_)));
    }

    #[tokio::test]
    async fn test_partial_key_pair_rejected() {
        let mut credentials = AwsCredentials::default();
        credentials.set_access_key(Some("AKIA".to_string()));

        let err = S3Client::new(&credentials, &S3ClientOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
