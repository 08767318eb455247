//! Error types for S3 operations

use std::io;
use thiserror::Error;

/// Result type alias for S3 operations
pub type S3Result<T> = Result<T, S3Error>;

/// Errors raised by the object store layer
///
/// These are the SDK-level errors. [`S3Client`](super::S3Client) never
/// reclassifies them; the resource connector is the translation boundary.
#[derive(Error, Debug, Clone)]
pub enum S3Error {
    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// S3 service error with specific error code
    #[error("S3 service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Object not found in bucket
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Access denied error
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URI that cannot be mapped to a bucket and key
    #[error("Invalid resource location: {0}")]
    InvalidLocation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl S3Error {
    /// Check if the error means the object key does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            S3Error::NotFound { .. } => true,
            S3Error::Service { code, .. } => code == "NoSuchKey" || code == "NotFound",
            _ => false,
        }
    }

    /// Check if the error comes from a malformed location or client setup
    pub fn is_configuration(&self) -> bool {
        matches!(self, S3Error::InvalidConfig(_) | S3Error::InvalidLocation(_))
    }

    /// Check if error is transient (a caller could retry it)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            S3Error::Network(_) | S3Error::Timeout(_) | S3Error::Io(_)
        )
    }
}

impl From<io::Error> for S3Error {
    fn from(err: io::Error) -> Self {
        S3Error::Io(err.to_string())
    }
}

/// Convert AWS SDK errors to S3Error
impl<E> From<aws_sdk_s3::error::SdkError<E>> for S3Error
where
    E: std::error::Error + 'static,
{
    fn from(error: aws_sdk_s3::error::SdkError<E>) -> Self {
        use aws_sdk_s3::error::{DisplayErrorContext, SdkError};

        match error {
            SdkError::DispatchFailure(e) => {
                S3Error::Network(format!("Network dispatch failure: {:?}", e))
            }
            SdkError::ResponseError(e) => S3Error::Network(format!("Response error: {:?}", e)),
            SdkError::TimeoutError(e) => S3Error::Timeout(format!("{:?}", e)),
            SdkError::ServiceError(e) => {
                let err_str = format!("{}", DisplayErrorContext(e.err()));

                if err_str.contains("NoSuchKey") {
                    S3Error::Service {
                        code: "NoSuchKey".to_string(),
                        message: "The specified key does not exist".to_string(),
                    }
                } else if err_str.contains("NoSuchBucket") {
                    S3Error::Service {
                        code: "NoSuchBucket".to_string(),
                        message: "The specified bucket does not exist".to_string(),
                    }
                } else if err_str.contains("AccessDenied") {
                    S3Error::AccessDenied("Access denied to resource".to_string())
                } else {
                    S3Error::Service {
                        code: "Unknown".to_string(),
                        message: err_str,
                    }
                }
            }
            other => S3Error::Sdk(format!("{}", DisplayErrorContext(&other))),
        }
    }
}
