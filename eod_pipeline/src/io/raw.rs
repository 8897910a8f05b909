use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::{
    errors::PipelineError,
    models::{RunDate, Symbol},
    store::{CONTENT_TYPE_JSON, ObjectStore, StoreError, keys::raw_partition_key, require_bucket},
};

/// Reads and writes raw provider payloads, one object per (symbol, run date).
///
/// The key is fully determined by its inputs, so writing the same partition
/// twice leaves one object holding the second write.
#[derive(Clone)]
pub struct RawPartitions {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    provider: &'static str,
}

impl RawPartitions {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, provider: &'static str) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            provider,
        }
    }

    /// Fails with [`StoreError::MissingBucket`] if no bucket is configured.
    pub fn require_bucket(&self) -> Result<&str, StoreError> {
        require_bucket(&self.bucket)
    }

    pub fn key(&self, symbol: &Symbol, run_date: RunDate) -> String {
        raw_partition_key(self.provider, symbol, run_date)
    }

    /// Serializes `document` and writes it to the symbol's partition.
    ///
    /// Returns the key written.
    pub async fn write(
        &self,
        symbol: &Symbol,
        run_date: RunDate,
        document: &Value,
    ) -> Result<String, StoreError> {
        let bucket = self.require_bucket()?;
        let key = self.key(symbol, run_date);
        let body = serde_json::to_vec(document).map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;

        self.store.put(bucket, &key, body, CONTENT_TYPE_JSON).await?;
        info!(%symbol, bucket, %key, "uploaded raw partition");
        Ok(key)
    }

    /// Reads and decodes the symbol's partition.
    ///
    /// A missing partition is a hard error ([`StoreError::NotFound`]).
    pub async fn read(&self, symbol: &Symbol, run_date: RunDate) -> Result<Value, PipelineError> {
        let bucket = self.require_bucket()?;
        let key = self.key(symbol, run_date);
        info!(%symbol, bucket, %key, "reading raw partition");

        let body = self.store.get(bucket, &key).await?;
        serde_json::from_slice(&body).map_err(|source| PipelineError::Decode { key, source })
    }
}
