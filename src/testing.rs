//! In-memory transport wiring
//!
//! Builds real [`RepositoryTransport`]s over a shared [`MemoryStore`] so the
//! wagon and registry layers can be driven end to end without a network.

use crate::credentials::Credentials;
use crate::error::{Result, TransportError};
use crate::protocol::s3::{MemoryStore, S3Client};
use crate::transport::{
    s3_credentials, HostServices, RepositoryTransport, RepositoryTransportFactory,
    S3TransportBuilder, S3_SCHEME,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Transport factory whose transports all share one [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryTransportFactory {
    store: MemoryStore,
    host: HostServices,
}

impl MemoryTransportFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            host: HostServices::default(),
        }
    }

    pub fn with_host_services(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl RepositoryTransportFactory for MemoryTransportFactory {
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

        // Same credential rules as the SDK-backed factory, even though the
        // store ignores them.
        s3_credentials(credentials)?;

        S3TransportBuilder::new()
            .name(name)
            .client(S3Client::from_store(Arc::new(self.store.clone())))
            .host_services(self.host.clone())
            .build()
            .await
    }
}
