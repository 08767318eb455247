//! Wagon registry and plugin container handshake
//!
//! Maps repository URI schemes to the wagon implementation and the
//! deploy-delegate factory that serve them, and registers the wagon with a
//! [`PluginContainer`] so the deployment subsystem can look it up.

use crate::error::{Result as TransportResult, TransportError};
use crate::repository::ArtifactRepository;
use crate::transport::RepositoryTransportFactory;
use crate::wagon::{DelegatingDeployWagon, DeployDelegate, S3DeployDelegate, WAGON_ROLE};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Box future for async factory functions
pub type BoxFuture<T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>;

/// Builds the deploy delegate for (protocol, repository, transport factory)
pub type DeployDelegateFactory = Arc<
    dyn Fn(
            String,
            ArtifactRepository,
            Arc<dyn RepositoryTransportFactory>,
        ) -> BoxFuture<TransportResult<Arc<dyn DeployDelegate>>>
        + Send
        + Sync,
>;

/// Constructs a fresh wagon instance for a protocol
pub type WagonFactory = Arc<dyn Fn(&str) -> DelegatingDeployWagon + Send + Sync>;

/// Implementation name of the built-in S3 wagon
pub const S3_WAGON_IMPLEMENTATION: &str = "orbit_wagon::S3DeployWagon";

// ============================================================================
// Plugin container
// ============================================================================

/// How a container instantiates a component on lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationStrategy {
    /// One instance, created on first lookup and returned thereafter
    Singleton,
    /// A new instance per lookup
    PerLookup,
}

/// Component registration handed to a plugin container
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub role: String,
    pub role_hint: String,
    pub implementation: String,
    pub instantiation: InstantiationStrategy,
    pub factory: WagonFactory,
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("role", &self.role)
            .field("role_hint", &self.role_hint)
            .field("implementation", &self.implementation)
            .field("instantiation", &self.instantiation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Component lookup failed for {role}/{hint}: {message}")]
    ComponentLookup {
        role: String,
        hint: String,
        message: String,
    },

    #[error("Component repository rejected {implementation}: {message}")]
    ComponentRepository {
        implementation: String,
        message: String,
    },

    #[error("Unsupported protocol: '{0}'")]
    UnsupportedProtocol(String),
}

/// The host side of wagon registration
pub trait PluginContainer: Send + Sync {
    fn add_component_descriptor(&self, descriptor: ComponentDescriptor)
        -> Result<(), ContainerError>;

    fn lookup_wagon(
        &self,
        role: &str,
        hint: &str,
    ) -> Result<Arc<DelegatingDeployWagon>, ContainerError>;
}

struct ComponentEntry {
    descriptor: ComponentDescriptor,
    singleton: Option<Arc<DelegatingDeployWagon>>,
}

/// In-process plugin container honouring the instantiation strategy
#[derive(Default)]
pub struct ComponentContainer {
    components: RwLock<HashMap<(String, String), ComponentEntry>>,
}

impl ComponentContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }
}

impl PluginContainer for ComponentContainer {
    fn add_component_descriptor(
        &self,
        descriptor: ComponentDescriptor,
    ) -> Result<(), ContainerError> {
        let key = (descriptor.role.clone(), descriptor.role_hint.clone());
        let mut components = self.components.write();

        if let Some(existing) = components.get(&key) {
            if existing.descriptor.implementation != descriptor.implementation {
                return Err(ContainerError::ComponentRepository {
                    implementation: descriptor.implementation,
                    message: format!(
                        "{}/{} is already provided by {}",
                        key.0, key.1, existing.descriptor.implementation
                    ),
                });
            }
            // Re-registering the same implementation keeps the configured instance
            return Ok(());
        }

        debug!(
            "Registered component {} as {}/{}",
            descriptor.implementation, key.0, key.1
        );
        components.insert(
            key,
            ComponentEntry {
                descriptor,
                singleton: None,
            },
        );
        Ok(())
    }

    fn lookup_wagon(
        &self,
        role: &str,
        hint: &str,
    ) -> Result<Arc<DelegatingDeployWagon>, ContainerError> {
        if role != WAGON_ROLE {
            return Err(ContainerError::ComponentLookup {
                role: role.to_string(),
                hint: hint.to_string(),
                message: "role does not produce wagons".to_string(),
            });
        }

        let key = (role.to_string(), hint.to_string());
        let mut components = self.components.write();
        let entry = components
            .get_mut(&key)
            .ok_or_else(|| ContainerError::UnsupportedProtocol(hint.to_string()))?;

        let factory = Arc::clone(&entry.descriptor.factory);
        match entry.descriptor.instantiation {
            InstantiationStrategy::PerLookup => Ok(Arc::new((*factory)(hint))),
            InstantiationStrategy::Singleton => {
                let wagon = entry
                    .singleton
                    .get_or_insert_with(|| Arc::new((*factory)(hint)));
                Ok(Arc::clone(wagon))
            }
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Wagon implementation and delegate factory for one protocol
#[derive(Clone)]
pub struct WagonContext {
    protocol: String,
    implementation: String,
    wagon_factory: WagonFactory,
    delegate_factory: DeployDelegateFactory,
}

impl WagonContext {
    pub fn new(
        protocol: impl Into<String>,
        implementation: impl Into<String>,
        wagon_factory: WagonFactory,
        delegate_factory: DeployDelegateFactory,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            implementation: implementation.into(),
            wagon_factory,
            delegate_factory,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    pub fn delegate_factory(&self) -> &DeployDelegateFactory {
        &self.delegate_factory
    }

    fn descriptor(&self, protocol: &str) -> ComponentDescriptor {
        ComponentDescriptor {
            role: WAGON_ROLE.to_string(),
            role_hint: protocol.to_string(),
            implementation: self.implementation.clone(),
            // A per-lookup component would hand out fresh wagons without a delegate
            instantiation: InstantiationStrategy::Singleton,
            factory: Arc::clone(&self.wagon_factory),
        }
    }
}

/// Delegate factory for S3 repositories
pub fn s3_delegate_factory() -> DeployDelegateFactory {
    Arc::new(
        |protocol: String,
         repository: ArtifactRepository,
         transport_factory: Arc<dyn RepositoryTransportFactory>|
         -> BoxFuture<TransportResult<Arc<dyn DeployDelegate>>> {
            Box::pin(async move {
                let delegate =
                    S3DeployDelegate::new(&protocol, repository, transport_factory.as_ref())
                        .await?;
                Ok(Arc::new(delegate) as Arc<dyn DeployDelegate>)
            })
        },
    )
}

/// The built-in `s3` wagon context
pub fn s3_wagon_context() -> WagonContext {
    WagonContext::new(
        "s3",
        S3_WAGON_IMPLEMENTATION,
        Arc::new(|protocol: &str| DelegatingDeployWagon::new(protocol)),
        s3_delegate_factory(),
    )
}

/// Scheme to wagon mapping
///
/// Schemes are stored lower-cased, so lookup is case-insensitive. A new
/// registry already serves `s3`.
pub struct WagonRegistry {
    contexts: RwLock<HashMap<String, WagonContext>>,
}

impl Default for WagonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WagonRegistry {
    pub fn new() -> Self {
        let registry = Self {
            contexts: RwLock::new(HashMap::new()),
        };
        // The built-in protocol is never blank
        let _ = registry.add(s3_wagon_context());
        registry
    }

    /// Add or replace the context for its protocol
    pub fn add(&self, context: WagonContext) -> TransportResult<()> {
        if context.protocol.trim().is_empty() {
            return Err(TransportError::configuration(
                "protocol may not be empty or blank",
            ));
        }
        let key = context.protocol.to_lowercase();
        self.contexts.write().insert(key, context);
        Ok(())
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.contexts.read().contains_key(&scheme.to_lowercase())
    }

    /// Registered schemes, sorted
    pub fn protocols(&self) -> Vec<String> {
        let mut protocols: Vec<String> = self.contexts.read().keys().cloned().collect();
        protocols.sort();
        protocols
    }

    fn context(&self, scheme: &str) -> Option<WagonContext> {
        self.contexts.read().get(&scheme.to_lowercase()).cloned()
    }

    /// Delegate factory serving `scheme`, without touching any container
    pub fn resolve_delegate_factory(&self, scheme: &str) -> Option<DeployDelegateFactory> {
        self.context(scheme).map(|c| c.delegate_factory)
    }

    /// Register the wagon for `repository`'s scheme and attach its delegate
    ///
    /// Declares a singleton component for the scheme, looks the instance up and
    /// builds the delegate on it. Every failure is a configuration error.
    pub async fn register(
        &self,
        container: &dyn PluginContainer,
        repository: &ArtifactRepository,
        transport_factory: Arc<dyn RepositoryTransportFactory>,
    ) -> TransportResult<Arc<DelegatingDeployWagon>> {
        let protocol = repository.protocol();
        let context = self.context(&protocol).ok_or_else(|| {
            TransportError::configuration_with(
                "Failed to register wagon",
                ContainerError::UnsupportedProtocol(protocol.clone()),
            )
        })?;

        container
            .add_component_descriptor(context.descriptor(&protocol))
            .map_err(|e| TransportError::configuration_with("Failed to register wagon", e))?;

        let wagon = container
            .lookup_wagon(WAGON_ROLE, &protocol)
            .map_err(|e| TransportError::configuration_with("Failed to register wagon", e))?;

        wagon
            .create_delegate(
                &context.delegate_factory,
                repository.clone(),
                transport_factory,
            )
            .await
            .map_err(|e| TransportError::configuration_with("Failed to register wagon", e))?;

        info!(
            "Registered {} wagon for repository '{}'",
            protocol,
            repository.name()
        );
        Ok(wagon)
    }
}
