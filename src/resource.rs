/*!
 * Remote resource model
 *
 * An [`ExternalResource`] is one fetched remote object: its URI, its metadata
 * and a content stream that can be taken exactly once.
 */

use crate::error::{Result, TransportError};
use crate::protocol::s3::{BoxedReader, ObjectMetadata, StoredObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Hex digest of resource content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashValue(String);

impl HashValue {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of a remote resource as seen by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalResourceMetaData {
    pub location: Url,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_length: i64,
    pub etag: Option<String>,
    /// Never populated for object store resources
    pub sha1: Option<HashValue>,
}

impl ExternalResourceMetaData {
    pub fn from_object(location: Url, metadata: &ObjectMetadata) -> Self {
        Self {
            location,
            last_modified: metadata.last_modified,
            content_length: metadata.content_length,
            etag: metadata.etag.clone(),
            sha1: None,
        }
    }
}

/// A fetched remote object
#[async_trait]
pub trait ExternalResource: Send {
    fn uri(&self) -> &Url;

    fn content_length(&self) -> i64;

    fn is_local(&self) -> bool;

    fn meta_data(&self) -> ExternalResourceMetaData;

    /// Take the content stream; fails on the second call
    fn open_stream(&mut self) -> Result<BoxedReader>;

    /// Copy the content into `destination`, returning the number of bytes written
    async fn write_to(&mut self, destination: &Path) -> Result<u64> {
        let mut stream = self.open_stream()?;
        let uri = self.uri().clone();

        let mut file = File::create(destination)
            .await
            .map_err(|e| TransportError::io(&uri, e))?;
        let written = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| TransportError::io(&uri, e))?;
        file.flush().await.map_err(|e| TransportError::io(&uri, e))?;

        Ok(written)
    }
}

/// Object store resource backed by an opened object
pub struct S3Resource {
    uri: Url,
    metadata: ObjectMetadata,
    body: Option<BoxedReader>,
}

impl S3Resource {
    pub fn new(object: StoredObject, uri: Url) -> Self {
        Self {
            uri,
            metadata: object.metadata,
            body: Some(object.body),
        }
    }

    /// Whether the content stream has already been taken
    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for S3Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Resource")
            .field("uri", &self.uri.as_str())
            .field("metadata", &self.metadata)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

#[async_trait]
impl ExternalResource for S3Resource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    fn content_length(&self) -> i64 {
        self.metadata.content_length
    }

    fn is_local(&self) -> bool {
        false
    }

    fn meta_data(&self) -> ExternalResourceMetaData {
        ExternalResourceMetaData::from_object(self.uri.clone(), &self.metadata)
    }

    fn open_stream(&mut self) -> Result<BoxedReader> {
        self.body.take().ok_or_else(|| {
            TransportError::io(
                &self.uri,
                "content stream already consumed; fetch the resource again to re-read it",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    fn resource(bytes: &[u8]) -> S3Resource {
        let object = StoredObject {
            metadata: ObjectMetadata {
                last_modified: Some(Utc::now()),
                content_length: bytes.len() as i64,
                etag: Some("\"etag\"".to_string()),
            },
            body: Box::new(Cursor::new(bytes.to_vec())),
        };
        S3Resource::new(object, Url::parse("s3://bucket/a/b.jar").unwrap())
    }

    #[tokio::test]
    async fn test_stream_is_single_use() {
        let mut res = resource(b"content");

        let mut buf = Vec::new();
        res.open_stream().unwrap().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"content");
        assert!(res.is_consumed());

        assert!(matches!(res.open_stream(), Err(TransportError::Io { .. })));
    }

    #[test]
    fn test_metadata_has_no_sha1() {
        let res = resource(b"abc");
        let meta = res.meta_data();

        assert!(!res.is_local());
        assert_eq!(meta.content_length, 3);
        assert_eq!(meta.etag.as_deref(), Some("\"etag\""));
        assert!(meta.sha1.is_none());
        assert_eq!(meta.location.as_str(), "s3://bucket/a/b.jar");
    }

    #[test]
    fn test_metadata_matches_store_metadata() {
        let modified = Utc::now();
        let object = ObjectMetadata {
            last_modified: Some(modified),
            content_length: 7,
            etag: None,
        };
        let location = Url::parse("s3://bucket/c.pom").unwrap();

        let meta = ExternalResourceMetaData::from_object(location.clone(), &object);
        assert_eq!(
            meta,
            ExternalResourceMetaData {
                location,
                last_modified: Some(modified),
                content_length: 7,
                etag: None,
                sha1: None,
            }
        );
    }

    #[tokio::test]
    async fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("b.jar");
        let mut res = resource(b"jar bytes");

        let written = res.write_to(&target).await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&target).unwrap(), b"jar bytes");
    }

    #[test]
    fn test_hash_value_normalises_case() {
        assert_eq!(HashValue::new("ABCDEF").as_hex(), "abcdef");
    }
}
