//! In-memory object store
//!
//! Behaves like a bucket service for the subset of calls in
//! [`ObjectStore`]: sorted keys, delimiter roll-up, paginated listings and
//! quoted MD5 ETags. Backs [`crate::testing::MemoryTransportFactory`].

use super::error::{S3Error, S3Result};
use super::store::{read_declared_body, ObjectStore};
use super::types::{BoxedReader, ListPage, ListRequest, ObjectMetadata, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::Arc;

/// Page size used when none is configured, matching the S3 service limit
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
    etag: String,
}

impl MemoryObject {
    fn new(data: Bytes, last_modified: DateTime<Utc>) -> Self {
        let etag = format!("\"{:x}\"", md5::compute(&data));
        Self {
            data,
            last_modified,
            etag,
        }
    }

    fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            last_modified: Some(self.last_modified),
            content_length: self.data.len() as i64,
            etag: Some(self.etag.clone()),
        }
    }
}

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub head: usize,
    pub get: usize,
    pub put: usize,
    pub list: usize,
}

impl RequestCounts {
    pub fn total(&self) -> usize {
        self.head + self.get + self.put + self.list
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: HashMap<String, BTreeMap<String, MemoryObject>>,
    requests: RequestCounts,
    offline: bool,
}

/// Shared in-memory store; clones see the same buckets
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Limit the number of entries returned per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store an object stamped with the current time
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.insert_with_modified(bucket, key, data, Utc::now());
    }

    /// Store an object with an explicit modification time
    pub fn insert_with_modified(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) {
        let mut state = self.state.lock();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), MemoryObject::new(data.into(), last_modified));
    }

    /// Make every subsequent call fail with a network error
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Calls received so far
    pub fn requests(&self) -> RequestCounts {
        self.state.lock().requests
    }

    /// Stored bytes for a key, if any
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| obj.data.clone())
    }

    /// All keys in a bucket, in sorted order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn check_online(state: &MemoryState) -> S3Result<()> {
        if state.offline {
            return Err(S3Error::Network("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn lookup(&self, bucket: &str, key: &str) -> S3Result<MemoryObject> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| S3Error::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

/// A listing entry: either a concrete key or a rolled-up prefix
enum Entry {
    Key(String),
    Prefix(String),
}

fn listing_entries(
    objects: &BTreeMap<String, MemoryObject>,
    prefix: &str,
    delimiter: Option<&str>,
) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::new();

    for key in objects.keys().filter(|k| k.starts_with(prefix)) {
        let rest = &key[prefix.len()..];
        let rolled = delimiter
            .filter(|d| !d.is_empty())
            .and_then(|d| rest.find(d).map(|idx| format!("{}{}", prefix, &rest[..idx + d.len()])));

        match rolled {
            // Keys are sorted, so equal prefixes are adjacent
            Some(common) => {
                if !matches!(entries.last(), Some(Entry::Prefix(last)) if *last == common) {
                    entries.push(Entry::Prefix(common));
                }
            }
            None => entries.push(Entry::Key(key.clone())),
        }
    }

    entries
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, bucket: &str, key: &str) -> S3Result<ObjectMetadata> {
        self.state.lock().requests.head += 1;
        Ok(self.lookup(bucket, key)?.metadata())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> S3Result<StoredObject> {
        self.state.lock().requests.get += 1;
        let object = self.lookup(bucket, key)?;
        Ok(StoredObject {
            metadata: object.metadata(),
            body: Box::new(Cursor::new(object.data)),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: BoxedReader,
        content_length: i64,
    ) -> S3Result<()> {
        {
            let mut state = self.state.lock();
            state.requests.put += 1;
            Self::check_online(&state)?;
        }

        let buffer = read_declared_body(body, content_length).await?;
        self.insert(bucket, key, buffer);
        Ok(())
    }

    async fn list_objects(&self, request: ListRequest) -> S3Result<ListPage> {
        let mut state = self.state.lock();
        state.requests.list += 1;
        Self::check_online(&state)?;

        let objects = state.buckets.get(&request.bucket).ok_or_else(|| S3Error::Service {
            code: "NoSuchBucket".to_string(),
            message: format!("The specified bucket does not exist: {}", request.bucket),
        })?;

        let entries = listing_entries(objects, &request.prefix, request.delimiter.as_deref());

        let start = match request.continuation_token.as_deref() {
            Some(token) => token.parse::<usize>().map_err(|_| S3Error::Service {
                code: "InvalidArgument".to_string(),
                message: format!("Invalid continuation token: {}", token),
            })?,
            None => 0,
        };
        let end = (start + self.page_size).min(entries.len());

        let mut page = ListPage::default();
        for entry in entries.iter().skip(start).take(end.saturating_sub(start)) {
            match entry {
                Entry::Key(key) => page.keys.push(key.clone()),
                Entry::Prefix(prefix) => page.common_prefixes.push(prefix.clone()),
            }
        }

        page.is_truncated = end < entries.len();
        if page.is_truncated {
            page.next_continuation_token = Some(end.to_string());
        }

        Ok(page)
    }
}
