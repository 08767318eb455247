/*!
 * Deploy wagon contract
 *
 * The wagon is the file-transfer plugin interface a deployment subsystem
 * drives: connect, transfer resources by name relative to a repository, and
 * disconnect, with session and transfer notifications along the way.
 */

mod delegate;
mod delegating;
mod error;
pub mod events;

pub use delegate::{DeployDelegate, S3DeployDelegate};
pub use delegating::DelegatingDeployWagon;
pub use error::{WagonError, WagonResult};
pub use events::{
    RequestType, SessionEvent, SessionEventType, SessionListener, TransferEvent,
    TransferEventType, TransferListener,
};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Component role wagons are registered under in a plugin container
pub const WAGON_ROLE: &str = "wagon";

/// Repository a wagon is connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: String,
    pub url: String,
}

impl Repository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationInfo {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyInfo {
    pub host: String,
    pub port: u16,
    pub non_proxy_hosts: Vec<String>,
}

/// Extra session parameters some callers pass to `connect`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub authentication: Option<AuthenticationInfo>,
    pub proxy: Option<ProxyInfo>,
}

#[async_trait]
pub trait Wagon: Send + Sync {
    fn protocol(&self) -> &str;

    async fn get(&self, resource_name: &str, destination: &Path) -> WagonResult<()>;

    /// Fetch the resource only if it changed after `timestamp` (epoch millis)
    async fn get_if_newer(
        &self,
        resource_name: &str,
        destination: &Path,
        timestamp: i64,
    ) -> WagonResult<bool>;

    async fn put(&self, source: &Path, resource_name: &str) -> WagonResult<()>;

    async fn put_directory(&self, source_directory: &Path, destination: &str) -> WagonResult<()>;

    async fn resource_exists(&self, resource_name: &str) -> WagonResult<bool>;

    async fn get_file_list(&self, destination_directory: &str) -> WagonResult<Vec<String>>;

    fn supports_directory_copy(&self) -> bool;

    fn repository(&self) -> Option<Repository>;

    /// Reset per-session state before a new connection
    fn open_connection(&self);

    fn connect(&self, repository: Repository);

    fn connect_with(&self, repository: Repository, options: ConnectOptions);

    fn disconnect(&self);

    fn add_session_listener(&self, listener: Arc<dyn SessionListener>);
    fn remove_session_listener(&self, listener: &Arc<dyn SessionListener>);
    fn has_session_listener(&self, listener: &Arc<dyn SessionListener>) -> bool;

    fn add_transfer_listener(&self, listener: Arc<dyn TransferListener>);
    fn remove_transfer_listener(&self, listener: &Arc<dyn TransferListener>);
    fn has_transfer_listener(&self, listener: &Arc<dyn TransferListener>) -> bool;

    fn is_interactive(&self) -> bool;
    fn set_interactive(&self, interactive: bool);

    /// Timeout in milliseconds; 0 means none
    fn timeout(&self) -> u32;
    fn set_timeout(&self, timeout: u32);
}
