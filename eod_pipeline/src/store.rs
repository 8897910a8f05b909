//! Object-store abstraction for the data lake.
//!
//! The pipeline only needs four operations from a blob store: put bytes, put a
//! local file, get bytes and list keys under a prefix. [`ObjectStore`] captures
//! that contract so the ingest and curate stages don't care whether objects end
//! up on a local disk ([`local::FsObjectStore`]) or in memory
//! ([`memory::InMemoryObjectStore`]).
//!
//! Writes are atomic at the object level and a second write to the same key
//! replaces the first. Partition keys are computed in [`keys`].

pub mod keys;
pub mod local;
pub mod memory;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use local::FsObjectStore;
pub use memory::InMemoryObjectStore;

/// Content type of raw provider payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type of curated partitions.
pub const CONTENT_TYPE_CSV: &str = "text/csv";

/// Errors raised by an [`ObjectStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No destination bucket was configured.
    #[error("Missing destination bucket (S3_BUCKET)")]
    MissingBucket,

    /// The requested object does not exist.
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    /// The key is not a valid relative object key.
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    /// Serializing a document before upload failed.
    #[error("failed to encode object {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The read/write contract the pipeline needs from a blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` to `bucket/key`, replacing any existing object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Uploads a local file to `bucket/key`.
    ///
    /// The default implementation reads the file into memory and calls [`put`](Self::put).
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let body = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.put(bucket, key, body, content_type).await
    }

    /// Reads the object at `bucket/key`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Lists keys in `bucket` starting with `prefix`, sorted ascending.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Rejects an empty (or blank) bucket name before any I/O happens.
pub fn require_bucket(bucket: &str) -> Result<&str, StoreError> {
    let bucket = bucket.trim();
    if bucket.is_empty() {
        return Err(StoreError::MissingBucket);
    }
    Ok(bucket)
}

/// Checks that `key` is a relative, `/`-separated key without `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
