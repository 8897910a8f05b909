use std::{path::PathBuf, sync::Arc};

use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

use crate::{
    errors::PipelineError,
    models::{PriceRow, RunDate},
    store::{CONTENT_TYPE_CSV, ObjectStore, keys::curated_partition_key, require_bucket},
};

/// Writes one curated CSV partition per run date.
///
/// The CSV is first written to a local temp file and then uploaded. The temp
/// file is removed afterwards whether the upload succeeded or not.
#[derive(Clone)]
pub struct CuratedPartitionWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    scratch_dir: Option<PathBuf>,
}

impl CuratedPartitionWriter {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            scratch_dir: None,
        }
    }

    /// Puts temp files in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn temp_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix("prices_daily_").suffix(".csv");
        match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// Writes `rows` (already in partition order) as the run date's partition.
    ///
    /// Returns the key written.
    pub async fn write(&self, run_date: RunDate, rows: &[PriceRow]) -> Result<String, PipelineError> {
        let bucket = require_bucket(&self.bucket)?;
        let key = curated_partition_key(run_date);

        let mut tmp = self.temp_file()?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        debug!(path = %tmp.path().display(), rows = rows.len(), "wrote curated CSV to temp file");

        // On error `tmp` is dropped here, which deletes the file.
        self.store
            .put_file(bucket, &key, tmp.path(), CONTENT_TYPE_CSV)
            .await?;
        tmp.close()?;

        info!(bucket, %key, rows = rows.len(), "uploaded curated partition");
        Ok(key)
    }
}
