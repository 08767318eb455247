//! Object store seam
//!
//! [`ObjectStore`] is the narrow set of SDK calls the client needs. The AWS SDK
//! client implements it directly; tests plug in [`MemoryStore`](super::MemoryStore).

use super::error::{S3Error, S3Result};
use super::types::{BoxedReader, ListPage, ListRequest, ObjectMetadata, StoredObject};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as AwsS3Client;
use tokio::io::AsyncReadExt;

/// Upper bound on the buffer reserved up front from a declared length
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// Read an upload body, checking it against the declared content length.
///
/// A negative length means unknown and accepts any body. At most
/// [`MAX_PREALLOCATION`] bytes are reserved before reading.
pub(crate) async fn read_declared_body(
    body: BoxedReader,
    content_length: i64,
) -> S3Result<Vec<u8>> {
    let mut buffer = match usize::try_from(content_length) {
        Ok(declared) => Vec::with_capacity(declared.min(MAX_PREALLOCATION)),
        Err(_) => Vec::new(),
    };

    if content_length < 0 {
        let mut body = body;
        body.read_to_end(&mut buffer).await?;
        return Ok(buffer);
    }

    // One byte past the declaration is enough to detect an oversized body.
    let limit = (content_length as u64).saturating_add(1);
    body.take(limit).read_to_end(&mut buffer).await?;

    let received = buffer.len() as u64;
    if received != content_length as u64 {
        let qualifier = if received > content_length as u64 { " or more" } else { "" };
        return Err(S3Error::Service {
            code: "IncompleteBody".to_string(),
            message: format!(
                "declared {} bytes but received {}{}",
                content_length, received, qualifier
            ),
        });
    }
    Ok(buffer)
}

/// Low-level object store operations against an explicit bucket and key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Head an object; fails with [`S3Error::NotFound`] when the key is absent
    async fn head_object(&self, bucket: &str, key: &str) -> S3Result<ObjectMetadata>;

    /// Open an object without reading its body
    async fn get_object(&self, bucket: &str, key: &str) -> S3Result<StoredObject>;

    /// Store `body` under the key with the declared content length
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: BoxedReader,
        content_length: i64,
    ) -> S3Result<()>;

    /// Fetch a single listing page
    async fn list_objects(&self, request: ListRequest) -> S3Result<ListPage>;
}

#[async_trait]
impl ObjectStore for AwsS3Client {
    async fn head_object(&self, bucket: &str, key: &str) -> S3Result<ObjectMetadata> {
        let response = self
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_not_found()) {
                    S3Error::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    S3Error::from(e)
                }
            })?;

        Ok(ObjectMetadata::from_aws(
            response.last_modified(),
            response.content_length(),
            response.e_tag(),
        ))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> S3Result<StoredObject> {
        let response = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    S3Error::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    S3Error::from(e)
                }
            })?;

        let metadata = ObjectMetadata::from_aws(
            response.last_modified(),
            response.content_length(),
            response.e_tag(),
        );

        Ok(StoredObject {
            metadata,
            body: Box::new(response.body.into_async_read()),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: BoxedReader,
        content_length: i64,
    ) -> S3Result<()> {
        // Single PutObject; multipart is left to the SDK's transfer tooling.
        let buffer = read_declared_body(body, content_length).await?;

        self.put_object()
            .bucket(bucket)
            .key(key)
            .content_length(content_length)
            .body(ByteStream::from(buffer))
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }

    async fn list_objects(&self, request: ListRequest) -> S3Result<ListPage> {
        let response = self
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter)
            .set_continuation_token(request.continuation_token)
            .send()
            .await
            .map_err(S3Error::from)?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(|k| k.to_string()))
            .collect();

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(|s| s.to_string()))
            .collect();

        Ok(ListPage {
            keys,
            common_prefixes,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> BoxedReader {
        Box::new(Cursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_body_matching_declaration() {
        let buffer = read_declared_body(reader(b"jar bytes"), 9).await.unwrap();
        assert_eq!(buffer, b"jar bytes");
    }

    #[tokio::test]
    async fn test_huge_declaration_does_not_reserve_it() {
        let err = read_declared_body(reader(b"abc"), i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::Service { ref code, .. } if code == "IncompleteBody"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let err = read_declared_body(reader(b"abcdef"), 2).await.unwrap_err();
        assert!(err.to_string().contains("declared 2 bytes"));
    }

    #[tokio::test]
    async fn test_unknown_length_reads_everything() {
        let buffer = read_declared_body(reader(b"abcdef"), -1).await.unwrap();
        assert_eq!(buffer.len(), 6);
    }
}
