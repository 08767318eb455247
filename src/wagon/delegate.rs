//! Deploy delegates
//!
//! A delegate performs the protocol-specific work behind a
//! [`DelegatingDeployWagon`](super::DelegatingDeployWagon).

use crate::error::{Result as TransportResult, TransportError};
use crate::repository::ArtifactRepository;
use crate::resource::ExternalResource;
use crate::transport::{RepositoryTransport, RepositoryTransportFactory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

#[async_trait]
pub trait DeployDelegate: Send + Sync {
    fn protocol(&self) -> &str;

    /// Last-modified time of the remote resource, if it can be determined
    async fn last_modified_date_of_remote(&self, resource_name: &str) -> Option<DateTime<Utc>>;

    async fn remote_resource_exist(&self, resource_name: &str) -> bool;

    async fn put_file(&self, file: &Path, resource_name: &str) -> TransportResult<()>;

    /// Fetch the resource into `destination`; `Ok(false)` when it does not exist
    async fn get_and_write_file(
        &self,
        destination: &Path,
        resource_name: &str,
    ) -> TransportResult<bool>;
}

/// Delegate that deploys through an S3 repository transport
#[derive(Debug)]
pub struct S3DeployDelegate {
    protocol: String,
    repository: ArtifactRepository,
    transport: RepositoryTransport,
}

impl S3DeployDelegate {
    pub async fn new(
        protocol: &str,
        repository: ArtifactRepository,
        transport_factory: &dyn RepositoryTransportFactory,
    ) -> TransportResult<Self> {
        let schemes: HashSet<String> = [protocol.to_ascii_lowercase()].into_iter().collect();
        let transport = transport_factory
            .create_transport(
                protocol,
                repository.name(),
                Some(repository.credentials_for_schemes(&schemes)),
            )
            .await?;

        Ok(Self::with_transport(protocol, repository, transport))
    }

    pub fn with_transport(
        protocol: &str,
        repository: ArtifactRepository,
        transport: RepositoryTransport,
    ) -> Self {
        Self {
            protocol: protocol.to_string(),
            repository,
            transport,
        }
    }

    pub fn transport(&self) -> &RepositoryTransport {
        &self.transport
    }
}

#[async_trait]
impl DeployDelegate for S3DeployDelegate {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    // Any failure reads as "no timestamp", so an outage looks like an absent
    // resource. Kept as-is until callers can tell the two apart.
    async fn last_modified_date_of_remote(&self, resource_name: &str) -> Option<DateTime<Utc>> {
        let location = self.repository.resolve(resource_name).ok()?;
        match self
            .transport
            .repository()
            .get_resource_meta_data(&location)
            .await
        {
            Ok(meta) => meta.last_modified,
            Err(e) => {
                debug!("No last-modified date for {}: {}", location, e);
                None
            }
        }
    }

    // Same collapse as above: NotFound and Io both answer false.
    async fn remote_resource_exist(&self, resource_name: &str) -> bool {
        let location = match self.repository.resolve(resource_name) {
            Ok(location) => location,
            Err(_) => return false,
        };
        match self
            .transport
            .repository()
            .get_resource_meta_data(&location)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!("Treating {} as absent: {}", location, e);
                false
            }
        }
    }

    async fn put_file(&self, file: &Path, resource_name: &str) -> TransportResult<()> {
        let location = self.repository.resolve(resource_name)?;
        self.transport.repository().put(file, &location).await
    }

    async fn get_and_write_file(
        &self,
        destination: &Path,
        resource_name: &str,
    ) -> TransportResult<bool> {
        let location = self.repository.resolve(resource_name)?;
        let mut resource = match self.transport.repository().get_resource(&location).await {
            Ok(resource) => resource,
            Err(TransportError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        resource.write_to(destination).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;
    use crate::protocol::s3::{MemoryStore, S3Client};
    use crate::transport::S3TransportBuilder;
    use chrono::TimeZone;
    use std::sync::Arc;
    use url::Url;

    async fn delegate(store: &MemoryStore) -> S3DeployDelegate {
        let transport = S3TransportBuilder::new()
            .name("releases")
            .client(S3Client::from_store(Arc::new(store.clone())))
            .build()
            .await
            .unwrap();
        let repository = ArtifactRepository::new(
            "releases",
            Url::parse("s3://bucket/releases").unwrap(),
            AwsCredentials::new("AKIA", "secret").into(),
        );
        S3DeployDelegate::with_transport("s3", repository, transport)
    }

    #[tokio::test]
    async fn test_exists_collapses_absence_and_outage() {
        let store = MemoryStore::new();
        store.insert("bucket", "releases/present.jar", "x");
        let delegate = delegate(&store).await;

        assert!(delegate.remote_resource_exist("present.jar").await);
        assert!(!delegate.remote_resource_exist("absent.jar").await);

        // An outage is deliberately indistinguishable from absence here.
        store.set_offline(true);
        assert!(!delegate.remote_resource_exist("present.jar").await);
    }

    #[tokio::test]
    async fn test_last_modified() {
        let store = MemoryStore::new();
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.insert_with_modified("bucket", "releases/a.pom", "x", modified);
        let delegate = delegate(&store).await;

        assert_eq!(
            delegate.last_modified_date_of_remote("a.pom").await,
            Some(modified)
        );
        assert_eq!(delegate.last_modified_date_of_remote("b.pom").await, None);

        store.set_offline(true);
        assert_eq!(delegate.last_modified_date_of_remote("a.pom").await, None);
    }

    #[tokio::test]
    async fn test_get_and_write_reports_absence() {
        let store = MemoryStore::new();
        store.insert("bucket", "releases/a.jar", "bytes");
        let delegate = delegate(&store).await;
        let dir = tempfile::tempdir().unwrap();

        let target = dir.path().join("a.jar");
        assert!(delegate.get_and_write_file(&target, "a.jar").await.unwrap());
        assert_eq!(std::fs::read(&target).unwrap(), b"bytes");

        let missing = dir.path().join("b.jar");
        assert!(!delegate.get_and_write_file(&missing, "b.jar").await.unwrap());

        store.set_offline(true);
        assert!(delegate.get_and_write_file(&target, "a.jar").await.is_err());
    }
}
