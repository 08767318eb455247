//! Errors raised through the wagon contract

use crate::error::{TransportError, EXIT_FATAL, EXIT_NOT_FOUND, EXIT_TRANSFER};
use thiserror::Error;

pub type WagonResult<T> = Result<T, WagonError>;

#[derive(Debug, Error)]
pub enum WagonError {
    /// The requested resource is absent from the repository
    #[error("'{0}' does not exist")]
    ResourceDoesNotExist(String),

    /// A get failed for a reason other than absence
    #[error("Cannot get and write file '{resource}'")]
    TransferFailed {
        resource: String,
        #[source]
        source: TransportError,
    },

    /// A put failed; the enclosing deploy must abort
    #[error("Could not put file to remote location: {resource}")]
    Deploy {
        resource: String,
        #[source]
        source: TransportError,
    },

    #[error("This wagon does not yet support the method: {method}")]
    Unsupported {
        method: String,
        #[source]
        source: TransportError,
    },

    /// No deploy delegate has been attached for the protocol
    #[error("No deploy delegate configured for protocol '{0}'")]
    NotConfigured(String),
}

impl WagonError {
    pub fn is_resource_missing(&self) -> bool {
        matches!(self, WagonError::ResourceDoesNotExist(_))
    }

    /// Check if the enclosing deploy operation must abort
    pub fn is_fatal(&self) -> bool {
        !self.is_resource_missing()
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WagonError::ResourceDoesNotExist(_) => EXIT_NOT_FOUND,
            WagonError::TransferFailed { .. } => EXIT_TRANSFER,
            WagonError::Deploy { .. }
            | WagonError::Unsupported { .. }
            | WagonError::NotConfigured(_) => EXIT_FATAL,
        }
    }
}
