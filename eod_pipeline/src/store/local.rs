//! Filesystem-backed object store: `<root>/<bucket>/<key>`.
//!
//! Each put writes into a temp file next to the destination and renames it
//! into place, so a reader never observes a half-written object.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{ObjectStore, StoreError, require_bucket, validate_key};

/// Prefix `tempfile` uses for in-flight writes; such files are never listed.
const IN_FLIGHT_PREFIX: &str = ".tmp";

/// A local directory acting as the data lake.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `bucket/key` under the lake root.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let bucket = require_bucket(bucket)?;
        validate_key(bucket)?;
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.root.join(bucket), |path, segment| path.join(segment)))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("object path has no parent directory"))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn collect_keys(dir: &Path, base: &Path, out: &mut Vec<String>) -> io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_keys(&path, base, out)?;
        } else if file_type.is_file() {
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(IN_FLIGHT_PREFIX)
            {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(base) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        debug!(path = %path.display(), bytes = body.len(), content_type, "writing object");

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &body))
            .await
            .map_err(io::Error::other)
            .and_then(|res| res)
            .map_err(io_err(&path))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let bucket = require_bucket(bucket)?;
        validate_key(bucket)?;
        let base = self.root.join(bucket);

        let walk_root = base.clone();
        let mut keys = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            collect_keys(&walk_root, &walk_root, &mut out).map(|_| out)
        })
        .await
        .map_err(io::Error::other)
        .and_then(|res| res)
        .map_err(io_err(&base))?;

        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
