//! Native S3 object store client for orbit-wagon
//!
//! This module wraps the official AWS SDK for Rust behind a URI-addressed
//! client: every call takes a `s3://bucket/key` location and derives the bucket
//! from the host and the key from the path.
//!
//! # Features
//!
//! - Pure Rust implementation using `aws-sdk-s3`
//! - Static key pair in front of the default credential provider chain
//! - Custom endpoints (MinIO, LocalStack, etc.)
//! - Paginated, delimiter-scoped listings
//! - An in-memory [`MemoryStore`] behind the same [`ObjectStore`] seam
//!
//! # Example
//!
//! ```ignore
//! use orbit_wagon::credentials::AwsCredentials;
//! use orbit_wagon::protocol::s3::{S3Client, S3ClientOptions};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = S3ClientOptions::default()
//!         .with_region("us-east-1")
//!         .with_endpoint("http://localhost:9000")
//!         .with_path_style();
//!
//!     let client = S3Client::new(&AwsCredentials::new("minioadmin", "minioadmin"), &options).await?;
//!     for name in client.list(&Url::parse("s3://my-bucket/releases/")?).await? {
//!         println!("{}", name);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod memory;
mod store;
mod types;
mod uri;

pub use client::{extract_resource_name, S3Client};
pub use config::S3ClientOptions;
pub use error::{S3Error, S3Result};
pub use memory::{MemoryStore, RequestCounts, DEFAULT_PAGE_SIZE};
pub use store::ObjectStore;
pub use types::{BoxedReader, ListPage, ListRequest, ObjectMetadata, StoredObject};
pub use uri::{bucket_key, bucket_name, ResourceLocation};

/// Default SDK operation timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
