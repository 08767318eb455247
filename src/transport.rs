/*!
 * Named repository transports
 *
 * [`S3TransportBuilder`] assembles a [`RepositoryTransport`] from credentials,
 * client options and the host's collaborators. The transport exposes a
 * [`ResourceRepository`] that deploy delegates talk to.
 */

use crate::connector::{
    ExternalResourceAccessor, ExternalResourceLister, ExternalResourceUploader,
    S3ResourceConnector, SourceFactory,
};
use crate::credentials::{AwsCredentials, Credentials};
use crate::error::{Result, TransportError};
use crate::protocol::s3::{BoxedReader, S3Client, S3ClientOptions};
use crate::resource::{ExternalResourceMetaData, S3Resource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Scheme served by [`DefaultRepositoryTransportFactory`]
pub const S3_SCHEME: &str = "s3";

// ============================================================================
// Host collaborators
// ============================================================================

/// Creates progress loggers for long-running operations
pub trait ProgressLoggerFactory: Send + Sync {
    fn new_operation(&self, description: &str) -> Box<dyn ProgressLogger>;
}

/// Progress of one operation
pub trait ProgressLogger: Send {
    fn started(&mut self);
    fn progress(&mut self, status: &str);
    fn completed(&mut self);
}

/// Hands out scratch files owned by the host
pub trait TemporaryFileProvider: Send + Sync {
    fn create_temporary_file(&self, prefix: &str, suffix: &str) -> std::io::Result<PathBuf>;
}

/// Index of previously fetched resources, keyed by location
pub trait CachedExternalResourceIndex: Send + Sync {
    fn lookup(&self, key: &str) -> Option<ExternalResourceMetaData>;
    fn store(&self, key: &str, meta_data: ExternalResourceMetaData);
    fn clear(&self, key: &str);
}

/// Time the enclosing build started
pub trait BuildCommencedTimeProvider: Send + Sync {
    fn current_time(&self) -> DateTime<Utc>;
}

/// Serialises access to the host's artifact cache
pub trait CacheLockingManager: Send + Sync {
    fn with_cache_lock(&self, operation: &str, action: &mut dyn FnMut());
}

/// Progress logger factory that reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgressLoggerFactory;

struct LoggingProgressLogger {
    description: String,
}

impl ProgressLoggerFactory for LoggingProgressLoggerFactory {
    fn new_operation(&self, description: &str) -> Box<dyn ProgressLogger> {
        Box::new(LoggingProgressLogger {
            description: description.to_string(),
        })
    }
}

impl ProgressLogger for LoggingProgressLogger {
    fn started(&mut self) {
        info!("{}", self.description);
    }

    fn progress(&mut self, status: &str) {
        debug!("{}: {}", self.description, status);
    }

    fn completed(&mut self) {
        debug!("{}: done", self.description);
    }
}

/// Wall clock time provider
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeProvider {
    started: DateTime<Utc>,
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self {
            started: Utc::now(),
        }
    }
}

impl BuildCommencedTimeProvider for SystemTimeProvider {
    fn current_time(&self) -> DateTime<Utc> {
        self.started
    }
}

/// Collaborators supplied by the host, threaded through unchanged
#[derive(Clone, Default)]
pub struct HostServices {
    pub progress_logger_factory: Option<Arc<dyn ProgressLoggerFactory>>,
    pub temporary_file_provider: Option<Arc<dyn TemporaryFileProvider>>,
    pub cached_external_resource_index: Option<Arc<dyn CachedExternalResourceIndex>>,
    pub time_provider: Option<Arc<dyn BuildCommencedTimeProvider>>,
    pub cache_locking_manager: Option<Arc<dyn CacheLockingManager>>,
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("progress_logger_factory", &self.progress_logger_factory.is_some())
            .field("temporary_file_provider", &self.temporary_file_provider.is_some())
            .field(
                "cached_external_resource_index",
                &self.cached_external_resource_index.is_some(),
            )
            .field("time_provider", &self.time_provider.is_some())
            .field("cache_locking_manager", &self.cache_locking_manager.is_some())
            .finish()
    }
}

// ============================================================================
// Resource repository
// ============================================================================

/// Resource-level facade over the connector
#[derive(Clone)]
pub struct ResourceRepository {
    connector: S3ResourceConnector,
    progress: Option<Arc<dyn ProgressLoggerFactory>>,
}

impl fmt::Debug for ResourceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRepository")
            .field("connector", &self.connector)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ResourceRepository {
    pub fn new(
        connector: S3ResourceConnector,
        progress: Option<Arc<dyn ProgressLoggerFactory>>,
    ) -> Self {
        Self {
            connector,
            progress,
        }
    }

    pub fn connector(&self) -> &S3ResourceConnector {
        &self.connector
    }

    fn start(&self, description: String) -> Option<Box<dyn ProgressLogger>> {
        self.progress.as_ref().map(|factory| {
            let mut logger = factory.new_operation(&description);
            logger.started();
            logger
        })
    }

    fn finish(logger: Option<Box<dyn ProgressLogger>>) {
        if let Some(mut logger) = logger {
            logger.completed();
        }
    }

    pub async fn get_resource(&self, location: &Url) -> Result<S3Resource> {
        let logger = self.start(format!("Download {}", location));
        let result = self.connector.get_resource(location).await;
        Self::finish(logger);
        result
    }

    pub async fn get_resource_meta_data(&self, location: &Url) -> Result<ExternalResourceMetaData> {
        self.connector.get_meta_data(location).await
    }

    /// Upload a local file to `destination`
    pub async fn put(&self, source: &Path, destination: &Url) -> Result<()> {
        let content_length = tokio::fs::metadata(source)
            .await
            .map_err(|e| TransportError::io(source.display(), e))?
            .len() as i64;

        let path = source.to_path_buf();
        let factory: Box<SourceFactory> = Box::new(move || -> std::io::Result<BoxedReader> {
            let file = std::fs::File::open(&path)?;
            let reader: BoxedReader = Box::new(tokio::fs::File::from_std(file));
            Ok(reader)
        });

        let mut logger = self.start(format!("Upload {}", destination));
        if let Some(logger) = logger.as_mut() {
            logger.progress(&format!("{} bytes", content_length));
        }
        let result = self
            .connector
            .upload(factory.as_ref(), content_length, destination)
            .await;
        Self::finish(logger);
        result
    }

    pub async fn list(&self, parent: &Url) -> Result<Vec<String>> {
        self.connector.list(parent).await
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A named transport bound to one repository
#[derive(Debug, Clone)]
pub struct RepositoryTransport {
    name: String,
    repository: ResourceRepository,
    host: HostServices,
}

impl RepositoryTransport {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository(&self) -> &ResourceRepository {
        &self.repository
    }

    pub fn host(&self) -> &HostServices {
        &self.host
    }
}

/// Builder for S3 transports
#[derive(Debug, Default)]
pub struct S3TransportBuilder {
    name: Option<String>,
    aws_credentials: Option<AwsCredentials>,
    options: S3ClientOptions,
    client: Option<S3Client>,
    host: HostServices,
}

impl S3TransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn aws_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.aws_credentials = Some(credentials);
        self
    }

    pub fn client_options(mut self, options: S3ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Use an existing client instead of building one from credentials
    pub fn client(mut self, client: S3Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn progress_logger_factory(mut self, factory: Arc<dyn ProgressLoggerFactory>) -> Self {
        self.host.progress_logger_factory = Some(factory);
        self
    }

    pub fn temporary_file_provider(mut self, provider: Arc<dyn TemporaryFileProvider>) -> Self {
        self.host.temporary_file_provider = Some(provider);
        self
    }

    pub fn cached_external_resource_index(
        mut self,
        index: Arc<dyn CachedExternalResourceIndex>,
    ) -> Self {
        self.host.cached_external_resource_index = Some(index);
        self
    }

    pub fn time_provider(mut self, provider: Arc<dyn BuildCommencedTimeProvider>) -> Self {
        self.host.time_provider = Some(provider);
        self
    }

    pub fn cache_locking_manager(mut self, manager: Arc<dyn CacheLockingManager>) -> Self {
        self.host.cache_locking_manager = Some(manager);
        self
    }

    pub fn host_services(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    pub async fn build(self) -> Result<RepositoryTransport> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(TransportError::configuration("Transport name is required")),
        };

        let connector = match self.client {
            Some(client) => S3ResourceConnector::with_client(client),
            None => {
                let credentials = self.aws_credentials.unwrap_or_default();
                S3ResourceConnector::new(&credentials, &self.options).await?
            }
        };

        debug!("Built S3 transport '{}'", name);

        Ok(RepositoryTransport {
            name,
            repository: ResourceRepository::new(
                connector,
                self.host.progress_logger_factory.clone(),
            ),
            host: self.host,
        })
    }
}

// ============================================================================
// Transport factories
// ============================================================================

/// Creates transports for a repository scheme
#[async_trait]
pub trait RepositoryTransportFactory: Send + Sync {
    async fn create_transport(
        &self,
        scheme: &str,
        name: &str,
        credentials: Option<&Credentials>,
    ) -> Result<RepositoryTransport>;
}

/// Factory for `s3` transports backed by the AWS SDK
#[derive(Debug, Clone, Default)]
pub struct DefaultRepositoryTransportFactory {
    options: S3ClientOptions,
    host: HostServices,
}

impl DefaultRepositoryTransportFactory {
    pub fn new(options: S3ClientOptions, host: HostServices) -> Self {
        Self { options, host }
    }
}

/// Access key pair for an `s3` transport
///
/// Password credentials are not usable against the object store.
pub fn s3_credentials(credentials: Option<&Credentials>) -> Result<AwsCredentials> {
    match credentials {
        None => Ok(AwsCredentials::default()),
        Some(Credentials::AccessKeyPair(aws)) => {
            if aws.is_partial() {
                return Err(TransportError::configuration(
                    "S3 credentials need both an access key and a secret key",
                ));
            }
            Ok(aws.clone())
        }
        Some(other) => Err(TransportError::configuration(format!(
            "Credentials must be an aws access key pair for the s3 scheme, found {}",
            other.kind()
        ))),
    }
}

#[async_trait]
impl RepositoryTransportFactory for DefaultRepositoryTransportFactory {
    async fn create_transport(
        &self,
        scheme: &str,
        name: &str,
        credentials: Option<&Credentials>,
    ) -> Result<RepositoryTransport> {
        if !scheme.eq_ignore_ascii_case(S3_SCHEME) {
            return Err(TransportError::configuration(format!(
                "No transport available for scheme '{}'",
                scheme
            )));
        }

        let aws = s3_credentials(credentials)?;

        S3TransportBuilder::new()
            .name(name)
            .aws_credentials(aws)
            .client_options(self.options.clone())
            .host_services(self.host.clone())
            .build()
            .await
    }
}
