//! Type definitions for S3 operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Boxed async byte stream, owned by whoever holds it
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Metadata returned by a head or get call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Last modified timestamp
    pub last_modified: Option<DateTime<Utc>>,

    /// Object size in bytes
    pub content_length: i64,

    /// ETag (entity tag), passed through untouched
    pub etag: Option<String>,
}

impl ObjectMetadata {
    /// Build metadata from the SDK's field accessors
    pub(crate) fn from_aws(
        last_modified: Option<&aws_sdk_s3::primitives::DateTime>,
        content_length: Option<i64>,
        etag: Option<&str>,
    ) -> Self {
        Self {
            last_modified: last_modified
                .and_then(|dt| SystemTime::try_from(*dt).ok())
                .map(DateTime::<Utc>::from),
            content_length: content_length.unwrap_or(0),
            etag: etag.map(|s| s.to_string()),
        }
    }
}

/// An opened object: metadata plus an unread body
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub body: BoxedReader,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// One page request against a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Object keys in store order
    pub keys: Vec<String>,

    /// Common prefixes (directories) rolled up by the delimiter
    pub common_prefixes: Vec<String>,

    /// Whether more pages follow
    pub is_truncated: bool,

    /// Token for the next page
    pub next_continuation_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_aws() {
        let dt = aws_sdk_s3::primitives::DateTime::from_secs(1_700_000_000);
        let meta = ObjectMetadata::from_aws(Some(&dt), Some(42), Some("\"abc\""));

        assert_eq!(meta.content_length, 42);
        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(
            meta.last_modified.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_metadata_defaults_missing_length() {
        let meta = ObjectMetadata::from_aws(None, None, None);
        assert_eq!(meta.content_length, 0);
        assert!(meta.last_modified.is_none());
        assert!(meta.etag.is_none());
    }
}
