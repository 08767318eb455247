//! Session and transfer notifications
//!
//! Listeners are plain observers held in registration order. Delivery is
//! synchronous: every listener has seen an event before the call that fired it
//! returns.

use std::fmt;
use std::sync::Arc;

/// Session lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventType {
    Opened,
    LoggedIn,
    Disconnecting,
    LoggedOff,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub protocol: String,
    pub event_type: SessionEventType,
}

/// Transfer lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEventType {
    Initiated,
    Started,
    Completed,
    Error,
}

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Get,
    Put,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Get => write!(f, "GET"),
            RequestType::Put => write!(f, "PUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    /// Resource name relative to the repository root
    pub resource: String,
    pub event_type: TransferEventType,
    pub request_type: RequestType,
    /// Failure message, set on [`TransferEventType::Error`] when a cause is known
    pub error: Option<String>,
}

impl TransferEvent {
    pub fn new(resource: &str, event_type: TransferEventType, request_type: RequestType) -> Self {
        Self {
            resource: resource.to_string(),
            event_type,
            request_type,
            error: None,
        }
    }

    pub fn failed(resource: &str, request_type: RequestType, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(resource, TransferEventType::Error, request_type)
        }
    }
}

pub trait SessionListener: Send + Sync {
    fn session_event(&self, event: &SessionEvent);
}

pub trait TransferListener: Send + Sync {
    fn transfer_event(&self, event: &TransferEvent);
}

impl<F> SessionListener for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn session_event(&self, event: &SessionEvent) {
        self(event)
    }
}

impl<F> TransferListener for F
where
    F: Fn(&TransferEvent) + Send + Sync,
{
    fn transfer_event(&self, event: &TransferEvent) {
        self(event)
    }
}

/// Ordered listener list; identity is the `Arc` allocation
pub(crate) struct ListenerList<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<L: ?Sized> ListenerList<L> {
    fn same(a: &Arc<L>, b: &Arc<L>) -> bool {
        std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
    }

    pub(crate) fn add(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Remove the first registration of `listener`
    pub(crate) fn remove(&mut self, listener: &Arc<L>) -> bool {
        match self.listeners.iter().position(|l| Self::same(l, listener)) {
            Some(idx) => {
                self.listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, listener: &Arc<L>) -> bool {
        self.listeners.iter().any(|l| Self::same(l, listener))
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Copy of the current listeners, so events can be fired without holding a lock
    pub(crate) fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.clone()
    }
}
