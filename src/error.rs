/*!
 * Error types for orbit-wagon
 *
 * [`TransportError`] is the taxonomy the resource connector and the registry
 * expose. Object store errors ([`S3Error`](crate::protocol::s3::S3Error)) are
 * translated into it at the connector boundary.
 */

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_TRANSFER: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_NOT_FOUND: i32 = 4;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The object key does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Network or SDK failure during get/put/list/head
    #[error("Could not transfer {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: BoxError,
    },

    /// Missing or invalid credentials, unknown scheme, container failures
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Operation this transport does not implement
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },
}

impl TransportError {
    pub fn io(location: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        TransportError::Io {
            location: location.to_string(),
            source: source.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        TransportError::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        TransportError::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        TransportError::Unsupported {
            operation: operation.into(),
        }
    }

    /// Check if the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }

    /// Check if this error is fatal (configuration and unsupported calls are never retried)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Configuration { .. } | TransportError::Unsupported { .. }
        )
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TransportError::NotFound(_) => EXIT_NOT_FOUND,
            TransportError::Io { .. } => EXIT_TRANSFER,
            TransportError::Configuration { .. } | TransportError::Unsupported { .. } => EXIT_FATAL,
        }
    }
}
