/*!
 * Resource connector
 *
 * Adapts [`S3Client`] to the three capability contracts the transport layer
 * consumes: listing, fetching with metadata, and uploading. This is where
 * object store errors are translated into [`TransportError`].
 */

use crate::credentials::AwsCredentials;
use crate::error::{Result, TransportError};
use crate::protocol::s3::{BoxedReader, S3Client, S3ClientOptions, S3Error};
use crate::resource::{ExternalResource, ExternalResourceMetaData, HashValue, S3Resource};
use async_trait::async_trait;
use std::io;
use tracing::debug;
use url::Url;

/// Produces a fresh, unconsumed upload stream each time it is called
pub type SourceFactory = dyn Fn() -> io::Result<BoxedReader> + Send + Sync;

/// Lists the resource names directly under a parent location
#[async_trait]
pub trait ExternalResourceLister: Send + Sync {
    async fn list(&self, parent: &Url) -> Result<Vec<String>>;
}

/// Fetches resources and their metadata
#[async_trait]
pub trait ExternalResourceAccessor: Send + Sync {
    type Resource: ExternalResource;

    /// Open the resource; fails with [`TransportError::NotFound`] when it does not exist
    async fn get_resource(&self, location: &Url) -> Result<Self::Resource>;

    /// Pre-computed SHA-1 of the resource, when the store offers one
    fn get_resource_sha1(&self, location: &Url) -> Option<HashValue>;

    async fn get_meta_data(&self, location: &Url) -> Result<ExternalResourceMetaData>;
}

/// Uploads content to a location
#[async_trait]
pub trait ExternalResourceUploader: Send + Sync {
    async fn upload(
        &self,
        source: &SourceFactory,
        content_length: i64,
        destination: &Url,
    ) -> Result<()>;
}

/// Connector over a single [`S3Client`]
#[derive(Debug, Clone)]
pub struct S3ResourceConnector {
    client: S3Client,
}

impl S3ResourceConnector {
    /// Build a connector with its own SDK client
    pub async fn new(credentials: &AwsCredentials, options: &S3ClientOptions) -> Result<Self> {
        let client = S3Client::new(credentials, options).await.map_err(|e| {
            TransportError::configuration_with("Could not create S3 client", e)
        })?;
        Ok(Self::with_client(client))
    }

    /// Build a connector around an existing client
    pub fn with_client(client: S3Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &S3Client {
        &self.client
    }
}

/// Translate an object store error at `location`
fn classify(location: &Url, err: S3Error) -> TransportError {
    if err.is_not_found() {
        TransportError::NotFound(location.to_string())
    } else if err.is_configuration() {
        TransportError::configuration_with(format!("Invalid S3 location {}", location), err)
    } else {
        TransportError::io(location, err)
    }
}

#[async_trait]
impl ExternalResourceLister for S3ResourceConnector {
    async fn list(&self, parent: &Url) -> Result<Vec<String>> {
        debug!("Listing parent resources: {}", parent);
        self.client
            .list(parent)
            .await
            .map_err(|e| TransportError::io(parent, e))
    }
}

#[async_trait]
impl ExternalResourceAccessor for S3ResourceConnector {
    type Resource = S3Resource;

    async fn get_resource(&self, location: &Url) -> Result<S3Resource> {
        debug!("Attempting to get resource: {}", location);
        let object = self
            .client
            .get_resource(location)
            .await
            .map_err(|e| classify(location, e))?;
        Ok(S3Resource::new(object, location.clone()))
    }

    fn get_resource_sha1(&self, _location: &Url) -> Option<HashValue> {
        None
    }

    async fn get_meta_data(&self, location: &Url) -> Result<ExternalResourceMetaData> {
        debug!("Attempting to get resource metadata: {}", location);
        let metadata = self
            .client
            .get_metadata(location)
            .await
            .map_err(|e| classify(location, e))?;
        Ok(ExternalResourceMetaData::from_object(
            location.clone(),
            &metadata,
        ))
    }
}

#[async_trait]
impl ExternalResourceUploader for S3ResourceConnector {
    async fn upload(
        &self,
        source: &SourceFactory,
        content_length: i64,
        destination: &Url,
    ) -> Result<()> {
        debug!("Attempting to get upload stream to : {}", destination);
        let stream = source().map_err(|e| TransportError::io(destination, e))?;
        self.client
            .put(stream, content_length, destination)
            .await
            .map_err(|e| classify(destination, e))
    }
}
