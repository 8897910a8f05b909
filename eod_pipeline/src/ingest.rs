//! Ingestion: fetch every symbol of the universe and persist the raw payloads.

use std::sync::Arc;

use tracing::info;

use crate::{
    errors::PipelineError,
    io::RawPartitions,
    models::{RunDate, Symbol},
    providers::{DataProvider, alpha_vantage::DailyPayload},
};

/// Keys written by a successful ingestion, in universe order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub run_date: RunDate,
    pub written: Vec<String>,
}

/// Runs fetch → classify → write for each symbol, strictly in order.
///
/// A provider error or rate-limit payload aborts the stage: the offending
/// payload is not written and later symbols are neither fetched nor written.
/// Every other payload is written verbatim, including ones without a time
/// series; curation decides what to do with those.
pub struct IngestionOrchestrator {
    provider: Arc<dyn DataProvider>,
    raw: RawPartitions,
    symbols: Vec<Symbol>,
}

impl IngestionOrchestrator {
    pub fn new(provider: Arc<dyn DataProvider>, raw: RawPartitions, symbols: Vec<Symbol>) -> Self {
        Self {
            provider,
            raw,
            symbols,
        }
    }

    pub async fn ingest_all(&self, run_date: RunDate) -> Result<IngestReport, PipelineError> {
        self.raw.require_bucket()?;
        info!(%run_date, provider = self.provider.code(), symbols = self.symbols.len(), "ingestion started");

        let mut written = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            info!(%symbol, "fetching daily series");
            let document = self
                .provider
                .fetch_daily(symbol)
                .await
                .map_err(|source| PipelineError::Fetch {
                    symbol: symbol.clone(),
                    source,
                })?;

            match DailyPayload::classify(&document) {
                DailyPayload::ProviderError(message) => {
                    return Err(PipelineError::ProviderPayload {
                        symbol: symbol.clone(),
                        message,
                    });
                }
                DailyPayload::RateLimited(note) => {
                    return Err(PipelineError::RateLimited {
                        symbol: symbol.clone(),
                        note,
                    });
                }
                DailyPayload::Series(_)
                | DailyPayload::Malformed { .. }
                | DailyPayload::InvalidSeries { .. } => {}
            }

            written.push(self.raw.write(symbol, run_date, &document).await?);
        }

        info!(%run_date, written = written.len(), "ingestion finished");
        Ok(IngestReport { run_date, written })
    }
}
