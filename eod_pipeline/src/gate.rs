//! Anomaly circuit breaker.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    errors::PipelineError,
    models::RunDate,
    warehouse::{ANOMALY_COUNT_SQL, QueryContext, QueryEngine, QueryError, Record},
};

/// Fails the run when the anomaly table is not empty.
#[derive(Clone)]
pub struct AnomalyGate {
    engine: Arc<dyn QueryEngine>,
    ctx: QueryContext,
}

impl AnomalyGate {
    pub fn new(engine: Arc<dyn QueryEngine>, ctx: QueryContext) -> Self {
        Self { engine, ctx }
    }

    /// Returns `Ok(0)` when there is nothing to report and
    /// [`PipelineError::AnomaliesDetected`] when the count is positive.
    pub async fn check_anomalies(&self, run_date: RunDate) -> Result<u64, PipelineError> {
        let records = self.engine.fetch_records(ANOMALY_COUNT_SQL, &self.ctx).await?;
        let count = anomaly_count(&records)?;

        if count > 0 {
            warn!(%run_date, count, "anomaly gate tripped");
            return Err(PipelineError::AnomaliesDetected { count });
        }
        info!(%run_date, "anomaly gate passed");
        Ok(count)
    }
}

/// First column of the first row; no rows, no columns or `NULL` count as zero.
pub fn anomaly_count(records: &[Record]) -> Result<u64, QueryError> {
    let Some(raw) = records.first().and_then(|row| row.first()).and_then(Option::as_deref) else {
        return Ok(0);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u64>()
        .map_err(|_| QueryError::UnexpectedResult(format!("anomaly count {raw:?} is not a non-negative integer")))
}
