/*!
 * orbit-wagon - S3 artifact transport and deploy-wagon adapter
 *
 * Lets a build or publishing tool read, write and enumerate artifacts kept in
 * an S3 bucket:
 * - Object store client over the AWS SDK, with an in-memory store for tests
 * - Resource connector implementing the lister, accessor and uploader contracts
 * - Named repository transports assembled by a builder
 * - A deploy wagon adapter with session and transfer notifications
 * - A scheme registry that wires wagons into a plugin container
 */

pub mod config;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod repository;
pub mod resource;
pub mod testing;
pub mod transport;
pub mod wagon;

// Re-export commonly used types
pub use config::WagonConfig;
pub use connector::S3ResourceConnector;
pub use credentials::{AwsCredentials, Credentials, PasswordCredentials};
pub use error::{Result, TransportError};
pub use protocol::s3::{S3Client, S3ClientOptions};
pub use registry::{ComponentContainer, WagonRegistry};
pub use repository::ArtifactRepository;
pub use resource::{ExternalResource, S3Resource};
pub use transport::{RepositoryTransport, RepositoryTransportFactory, S3TransportBuilder};
pub use wagon::{DelegatingDeployWagon, Wagon, WagonError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
