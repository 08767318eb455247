//! Wagon that forwards transfers to a [`DeployDelegate`]

use super::delegate::DeployDelegate;
use super::error::{WagonError, WagonResult};
use super::events::{
    ListenerList, RequestType, SessionEvent, SessionEventType, SessionListener, TransferEvent,
    TransferEventType, TransferListener,
};
use super::{ConnectOptions, Repository, Wagon};
use crate::error::{Result as TransportResult, TransportError};
use crate::registry::DeployDelegateFactory;
use crate::repository::ArtifactRepository;
use crate::transport::RepositoryTransportFactory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct WagonState {
    repository: Option<Repository>,
    session_listeners: ListenerList<dyn SessionListener>,
    transfer_listeners: ListenerList<dyn TransferListener>,
}

/// Wagon whose transfers are carried out by an attached delegate
///
/// The wagon itself only does lifecycle bookkeeping and event fan-out; it owns
/// no connection. Obtain one per protocol from a plugin container, then attach
/// the delegate with [`create_delegate`](Self::create_delegate).
pub struct DelegatingDeployWagon {
    protocol: String,
    state: Mutex<WagonState>,
    delegate: RwLock<Option<Arc<dyn DeployDelegate>>>,
}

impl std::fmt::Debug for DelegatingDeployWagon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatingDeployWagon")
            .field("protocol", &self.protocol)
            .field("repository", &self.state.lock().repository)
            .field("has_delegate", &self.delegate.read().is_some())
            .finish()
    }
}

impl DelegatingDeployWagon {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            state: Mutex::new(WagonState::default()),
            delegate: RwLock::new(None),
        }
    }

    /// Build the delegate for this wagon's protocol and attach it
    pub async fn create_delegate(
        &self,
        factory: &DeployDelegateFactory,
        repository: ArtifactRepository,
        transport_factory: Arc<dyn RepositoryTransportFactory>,
    ) -> TransportResult<()> {
        let delegate = (**factory)(self.protocol.clone(), repository, transport_factory).await?;
        self.set_delegate(delegate);
        Ok(())
    }

    pub fn set_delegate(&self, delegate: Arc<dyn DeployDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.read().is_some()
    }

    fn delegate(&self) -> WagonResult<Arc<dyn DeployDelegate>> {
        self.delegate
            .read()
            .clone()
            .ok_or_else(|| WagonError::NotConfigured(self.protocol.clone()))
    }

    fn fire_session(&self, event_type: SessionEventType) {
        let listeners = self.state.lock().session_listeners.snapshot();
        let event = SessionEvent {
            protocol: self.protocol.clone(),
            event_type,
        };
        for listener in listeners {
            listener.session_event(&event);
        }
    }

    fn fire_transfer(&self, event: TransferEvent) {
        let listeners = self.state.lock().transfer_listeners.snapshot();
        for listener in listeners {
            listener.transfer_event(&event);
        }
    }

    fn fire(&self, resource: &str, event_type: TransferEventType, request_type: RequestType) {
        self.fire_transfer(TransferEvent::new(resource, event_type, request_type));
    }

    async fn ensure_destination(destination: &Path) -> std::io::Result<()> {
        if tokio::fs::try_exists(destination).await? {
            return Ok(());
        }
        info!(
            "Wagon deployment supplied a file [{}] which does not exist, forcing create.",
            destination.display()
        );
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::File::create(destination).await?;
        Ok(())
    }

    fn not_supported(method: &str) -> WagonError {
        WagonError::Unsupported {
            method: method.to_string(),
            source: TransportError::unsupported(method),
        }
    }
}

#[async_trait]
impl Wagon for DelegatingDeployWagon {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    async fn get(&self, resource_name: &str, destination: &Path) -> WagonResult<()> {
        let delegate = self.delegate()?;
        self.fire(resource_name, TransferEventType::Initiated, RequestType::Get);
        self.fire(resource_name, TransferEventType::Started, RequestType::Get);

        if let Err(e) = Self::ensure_destination(destination).await {
            self.fire_transfer(TransferEvent::failed(resource_name, RequestType::Get, &e));
            return Err(WagonError::TransferFailed {
                resource: resource_name.to_string(),
                source: TransportError::io(destination.display(), e),
            });
        }

        match delegate.get_and_write_file(destination, resource_name).await {
            Ok(true) => {
                self.fire(resource_name, TransferEventType::Completed, RequestType::Get);
                Ok(())
            }
            Ok(false) => {
                self.fire_transfer(TransferEvent::failed(
                    resource_name,
                    RequestType::Get,
                    "resource does not exist",
                ));
                Err(WagonError::ResourceDoesNotExist(resource_name.to_string()))
            }
            Err(e) => {
                self.fire_transfer(TransferEvent::failed(resource_name, RequestType::Get, &e));
                Err(WagonError::TransferFailed {
                    resource: resource_name.to_string(),
                    source: e,
                })
            }
        }
    }

    async fn get_if_newer(
        &self,
        resource_name: &str,
        destination: &Path,
        timestamp: i64,
    ) -> WagonResult<bool> {
        if timestamp <= 0 {
            return Ok(false);
        }
        let local = match DateTime::<Utc>::from_timestamp_millis(timestamp) {
            Some(local) => local,
            None => return Ok(false),
        };

        let delegate = self.delegate()?;
        match delegate.last_modified_date_of_remote(resource_name).await {
            Some(remote) if remote > local => {
                debug!(
                    "Remote {} modified at {} is newer than local {}",
                    resource_name, remote, local
                );
                self.get(resource_name, destination).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn put(&self, source: &Path, resource_name: &str) -> WagonResult<()> {
        let delegate = self.delegate()?;
        self.fire(resource_name, TransferEventType::Initiated, RequestType::Put);
        self.fire(resource_name, TransferEventType::Started, RequestType::Put);

        if let Err(e) = delegate.put_file(source, resource_name).await {
            self.fire_transfer(TransferEvent::failed(resource_name, RequestType::Put, &e));
            return Err(WagonError::Deploy {
                resource: resource_name.to_string(),
                source: e,
            });
        }

        self.fire(resource_name, TransferEventType::Completed, RequestType::Put);
        Ok(())
    }

    async fn put_directory(&self, _source_directory: &Path, _destination: &str) -> WagonResult<()> {
        Err(Self::not_supported("put_directory"))
    }

    async fn resource_exists(&self, resource_name: &str) -> WagonResult<bool> {
        Ok(self.delegate()?.remote_resource_exist(resource_name).await)
    }

    async fn get_file_list(&self, _destination_directory: &str) -> WagonResult<Vec<String>> {
        Err(Self::not_supported("get_file_list"))
    }

    fn supports_directory_copy(&self) -> bool {
        false
    }

    fn repository(&self) -> Option<Repository> {
        self.state.lock().repository.clone()
    }

    fn open_connection(&self) {
        let mut state = self.state.lock();
        state.repository = None;
        state.session_listeners.clear();
        state.transfer_listeners.clear();
    }

    fn connect(&self, repository: Repository) {
        self.state.lock().repository = Some(repository);
        self.fire_session(SessionEventType::LoggedIn);
        self.fire_session(SessionEventType::Opened);
    }

    fn connect_with(&self, repository: Repository, _options: ConnectOptions) {
        self.connect(repository);
    }

    fn disconnect(&self) {
        self.fire_session(SessionEventType::Disconnecting);
        self.fire_session(SessionEventType::LoggedOff);
        self.fire_session(SessionEventType::Disconnected);
    }

    fn add_session_listener(&self, listener: Arc<dyn SessionListener>) {
        self.state.lock().session_listeners.add(listener);
    }

    fn remove_session_listener(&self, listener: &Arc<dyn SessionListener>) {
        self.state.lock().session_listeners.remove(listener);
    }

    fn has_session_listener(&self, listener: &Arc<dyn SessionListener>) -> bool {
        self.state.lock().session_listeners.contains(listener)
    }

    fn add_transfer_listener(&self, listener: Arc<dyn TransferListener>) {
        self.state.lock().transfer_listeners.add(listener);
    }

    fn remove_transfer_listener(&self, listener: &Arc<dyn TransferListener>) {
        self.state.lock().transfer_listeners.remove(listener);
    }

    fn has_transfer_listener(&self, listener: &Arc<dyn TransferListener>) -> bool {
        self.state.lock().transfer_listeners.contains(listener)
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn set_interactive(&self, _interactive: bool) {}

    fn timeout(&self) -> u32 {
        0
    }

    fn set_timeout(&self, _timeout: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegate with scripted answers and call counters
    #[derive(Default)]
    struct ScriptedDelegate {
        remote_modified: Option<DateTime<Utc>>,
        content: Option<Vec<u8>>,
        fail_io: bool,
        metadata_queries: AtomicUsize,
        gets: AtomicUsize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl DeployDelegate for ScriptedDelegate {
        fn protocol(&self) -> &str {
            "s3"
        }

        async fn last_modified_date_of_remote(&self, _resource: &str) -> Option<DateTime<Utc>> {
            self.metadata_queries.fetch_add(1, Ordering::SeqCst);
            self.remote_modified
        }

        async fn remote_resource_exist(&self, _resource: &str) -> bool {
            self.content.is_some() && !self.fail_io
        }

        async fn put_file(&self, _file: &Path, resource: &str) -> TransportResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail_io {
                return Err(TransportError::io(resource, "connection reset"));
            }
            Ok(())
        }

        async fn get_and_write_file(
            &self,
            destination: &Path,
            resource: &str,
        ) -> TransportResult<bool> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_io {
                return Err(TransportError::io(resource, "connection reset"));
            }
            match &self.content {
                Some(bytes) => {
                    tokio::fs::write(destination, bytes).await.unwrap();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn wagon_with(delegate: ScriptedDelegate) -> (DelegatingDeployWagon, Arc<ScriptedDelegate>) {
        let delegate = Arc::new(delegate);
        let wagon = DelegatingDeployWagon::new("s3");
        wagon.set_delegate(delegate.clone());
        (wagon, delegate)
    }

    fn record_transfers(wagon: &DelegatingDeployWagon) -> Arc<Mutex<Vec<TransferEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        wagon.add_transfer_listener(Arc::new(move |e: &TransferEvent| sink.lock().push(e.clone())));
        events
    }

    fn kinds(events: &Mutex<Vec<TransferEvent>>) -> Vec<TransferEventType> {
        events.lock().iter().map(|e| e.event_type).collect()
    }

    #[tokio::test]
    async fn test_get_creates_destination_and_completes() {
        let (wagon, _) = wagon_with(ScriptedDelegate {
            content: Some(b"pom".to_vec()),
            ..Default::default()
        });
        let events = record_transfers(&wagon);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/dir/a.pom");

        wagon.get("a.pom", &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"pom");
        assert_eq!(
            kinds(&events),
            vec![
                TransferEventType::Initiated,
                TransferEventType::Started,
                TransferEventType::Completed
            ]
        );
        assert!(events.lock().iter().all(|e| e.request_type == RequestType::Get));
    }

    #[tokio::test]
    async fn test_get_missing_resource() {
        let (wagon, _) = wagon_with(ScriptedDelegate::default());
        let events = record_transfers(&wagon);
        let dir = tempfile::tempdir().unwrap();

        let err = wagon.get("a.pom", &dir.path().join("a.pom")).await.unwrap_err();

        assert!(err.is_resource_missing());
        assert_eq!(kinds(&events).last(), Some(&TransferEventType::Error));
    }

    #[tokio::test]
    async fn test_get_io_failure_is_transfer_failed() {
        let (wagon, _) = wagon_with(ScriptedDelegate {
            fail_io: true,
            ..Default::default()
        });
        let events = record_transfers(&wagon);
        let dir = tempfile::tempdir().unwrap();

        let err = wagon.get("a.pom", &dir.path().join("a.pom")).await.unwrap_err();

        assert!(matches!(err, WagonError::TransferFailed { .. }));
        let last = events.lock().last().cloned().unwrap();
        assert_eq!(last.event_type, TransferEventType::Error);
        assert!(last.error.is_some());
    }

    #[tokio::test]
    async fn test_get_if_newer_zero_timestamp_never_queries() {
        let (wagon, delegate) = wagon_with(ScriptedDelegate {
            remote_modified: Some(Utc::now()),
            content: Some(b"x".to_vec()),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();

        for timestamp in [0, -1] {
            let updated = wagon
                .get_if_newer("a.jar", &dir.path().join("a.jar"), timestamp)
                .await
                .unwrap();
            assert!(!updated);
        }
        assert_eq!(delegate.metadata_queries.load(Ordering::SeqCst), 0);
        assert_eq!(delegate.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_if_newer_compares_strictly() {
        let remote = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let (wagon, delegate) = wagon_with(ScriptedDelegate {
            remote_modified: Some(remote),
            content: Some(b"x".to_vec()),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.jar");

        // Equal and later local timestamps transfer nothing.
        for local in [1_700_000_000_000, 1_700_000_000_001] {
            assert!(!wagon.get_if_newer("a.jar", &target, local).await.unwrap());
        }
        assert_eq!(delegate.gets.load(Ordering::SeqCst), 0);

        assert!(wagon
            .get_if_newer("a.jar", &target, 1_699_999_999_999)
            .await
            .unwrap());
        assert_eq!(delegate.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_if_newer_without_remote_date() {
        let (wagon, delegate) = wagon_with(ScriptedDelegate::default());
        let dir = tempfile::tempdir().unwrap();

        assert!(!wagon
            .get_if_newer("a.jar", &dir.path().join("a.jar"), 1)
            .await
            .unwrap());
        assert_eq!(delegate.metadata_queries.load(Ordering::SeqCst), 1);
        assert_eq!(delegate.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_put_failure_is_fatal_deploy_error() {
        let (wagon, _) = wagon_with(ScriptedDelegate {
            fail_io: true,
            ..Default::default()
        });
        let events = record_transfers(&wagon);

        let err = wagon
            .put(Path::new("app.jar"), "org/app/app.jar")
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("org/app/app.jar"));
        assert_eq!(
            kinds(&events),
            vec![
                TransferEventType::Initiated,
                TransferEventType::Started,
                TransferEventType::Error
            ]
        );
    }

    #[tokio::test]
    async fn test_put_success_completes() {
        let (wagon, delegate) = wagon_with(ScriptedDelegate::default());
        let events = record_transfers(&wagon);

        wagon.put(Path::new("app.jar"), "app.jar").await.unwrap();

        assert_eq!(delegate.puts.load(Ordering::SeqCst), 1);
        assert_eq!(kinds(&events).last(), Some(&TransferEventType::Completed));
    }

    #[tokio::test]
    async fn test_resource_exists_delegates() {
        let (wagon, _) = wagon_with(ScriptedDelegate {
            content: Some(b"x".to_vec()),
            ..Default::default()
        });
        assert!(wagon.resource_exists("a.jar").await.unwrap());

        let (wagon, _) = wagon_with(ScriptedDelegate::default());
        assert!(!wagon.resource_exists("a.jar").await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let (wagon, _) = wagon_with(ScriptedDelegate::default());

        let err = wagon.put_directory(Path::new("dir"), "dest").await.unwrap_err();
        assert!(matches!(err, WagonError::Unsupported { .. }));

        let err = wagon.get_file_list("dest").await.unwrap_err();
        assert!(matches!(
            &err,
            WagonError::Unsupported { method, source: TransportError::Unsupported { .. } }
                if method == "get_file_list"
        ));
        assert!(!wagon.supports_directory_copy());
    }

    #[tokio::test]
    async fn test_missing_delegate() {
        let wagon = DelegatingDeployWagon::new("s3");
        let err = wagon.resource_exists("a.jar").await.unwrap_err();
        assert!(matches!(err, WagonError::NotConfigured(_)));
    }

    #[test]
    fn test_session_lifecycle_events_in_order() {
        let wagon = DelegatingDeployWagon::new("s3");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let sink = Arc::clone(&seen);
            wagon.add_session_listener(Arc::new(move |e: &SessionEvent| {
                sink.lock().push((tag, e.event_type))
            }));
        }

        wagon.connect_with(
            Repository::new("releases", "s3://bucket/releases"),
            ConnectOptions::default(),
        );
        assert_eq!(wagon.repository().unwrap().id, "releases");
        wagon.disconnect();

        let seen = seen.lock();
        let first: Vec<_> = seen.iter().filter(|(t, _)| *t == "first").map(|(_, e)| *e).collect();
        assert_eq!(
            first,
            vec![
                SessionEventType::LoggedIn,
                SessionEventType::Opened,
                SessionEventType::Disconnecting,
                SessionEventType::LoggedOff,
                SessionEventType::Disconnected,
            ]
        );
        // Each event reaches listeners in registration order.
        assert_eq!(seen[0], ("first", SessionEventType::LoggedIn));
        assert_eq!(seen[1], ("second", SessionEventType::LoggedIn));
    }

    #[test]
    fn test_listener_bookkeeping_and_reset() {
        let wagon = DelegatingDeployWagon::new("s3");
        let listener: Arc<dyn TransferListener> = Arc::new(|_: &TransferEvent| {});

        wagon.add_transfer_listener(Arc::clone(&listener));
        assert!(wagon.has_transfer_listener(&listener));
        wagon.remove_transfer_listener(&listener);
        assert!(!wagon.has_transfer_listener(&listener));

        wagon.add_transfer_listener(Arc::clone(&listener));
        wagon.connect(Repository::new("r", "s3://bucket"));
        wagon.open_connection();
        assert!(!wagon.has_transfer_listener(&listener));
        assert!(wagon.repository().is_none());
    }

    #[test]
    fn test_fixed_session_settings() {
        let wagon = DelegatingDeployWagon::new("s3");
        wagon.set_interactive(true);
        wagon.set_timeout(1000);
        assert!(!wagon.is_interactive());
        assert_eq!(wagon.timeout(), 0);
    }
}
