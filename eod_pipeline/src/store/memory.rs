//! In-memory object store, used by tests and dry runs.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use super::{ObjectStore, StoreError, require_bucket, validate_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Keeps every object in a sorted map keyed by `(bucket, key)`.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    puts: Mutex<Vec<String>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the stored object, if any.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of distinct objects currently stored.
    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Every key written, in write order (repeats included).
    pub fn put_log(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let bucket = require_bucket(bucket)?;
        validate_key(key)?;
        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        self.puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.to_string());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let bucket = require_bucket(bucket)?;
        self.object(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let bucket = require_bucket(bucket)?;
        Ok(self
            .objects()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_put_replaces_first() {
        let store = InMemoryObjectStore::new();
        store.put("b", "k/data.json", b"1".to_vec(), "application/json").await.unwrap();
        store.put("b", "k/data.json", b"2".to_vec(), "application/json").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("b", "k/data.json").await.unwrap(), b"2");
        assert_eq!(store.put_log(), vec!["k/data.json", "k/data.json"]);
    }

    #[tokio::test]
    async fn list_is_scoped_to_bucket_and_prefix() {
        let store = InMemoryObjectStore::new();
        store.put("a", "raw/1", vec![], "text/plain").await.unwrap();
        store.put("a", "curated/1", vec![], "text/plain").await.unwrap();
        store.put("b", "raw/2", vec![], "text/plain").await.unwrap();

        assert_eq!(store.list("a", "raw/").await.unwrap(), vec!["raw/1"]);
        assert!(matches!(store.list("", "raw/").await, Err(StoreError::MissingBucket)));
    }
}
