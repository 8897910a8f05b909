use thiserror::Error;

use crate::{
    models::Symbol,
    providers::ProviderError,
    store::StoreError,
    warehouse::QueryError,
};

/// Coarse error classes a scheduler or operator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP-level failure talking to the provider.
    Transport,
    /// Payload-level error or rate-limit signal from the provider.
    Provider,
    /// Missing configuration, unparseable data or an empty curated set.
    Validation,
    /// Object store read/write failure.
    Storage,
    /// SQL engine failure.
    Query,
    /// The anomaly gate tripped.
    Gate,
}

/// The unified error type of every pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The fetch itself failed (transport or missing credential).
    #[error("failed to fetch {symbol}: {source}")]
    Fetch {
        symbol: Symbol,
        #[source]
        source: ProviderError,
    },

    /// The provider answered with an error message instead of data.
    #[error("Alpha Vantage error for {symbol}: {message}")]
    ProviderPayload { symbol: Symbol, message: String },

    /// The provider answered with a rate-limit / quota note instead of data.
    #[error("Rate limit hit (Alpha Vantage) for {symbol}: {note}")]
    RateLimited { symbol: Symbol, note: String },

    /// An object store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A raw partition is not valid JSON.
    #[error("raw partition {key} is not valid JSON")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A bar in a provider series could not be parsed.
    #[error("cannot parse {field:?} for {symbol} on {date}: {reason}")]
    Parse {
        symbol: Symbol,
        date: String,
        field: &'static str,
        reason: String,
    },

    /// A precondition of the stage does not hold.
    #[error("{0}")]
    Validation(String),

    /// Writing the curated CSV failed.
    #[error("failed to write curated CSV")]
    Csv(#[from] csv::Error),

    /// Local filesystem failure (temp files).
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The SQL engine failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The anomaly gate found anomalies.
    #[error("Anomalies detected: {count}")]
    AnomaliesDetected { count: u64 },
}

impl PipelineError {
    /// Classifies the error into the pipeline's error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Fetch {
                source: ProviderError::MissingCredential { .. },
                ..
            } => ErrorClass::Validation,
            PipelineError::Fetch { .. } => ErrorClass::Transport,
            PipelineError::ProviderPayload { .. } | PipelineError::RateLimited { .. } => {
                ErrorClass::Provider
            }
            PipelineError::Store(StoreError::MissingBucket) => ErrorClass::Validation,
            PipelineError::Store(_) | PipelineError::Csv(_) | PipelineError::Io(_) => {
                ErrorClass::Storage
            }
            PipelineError::Decode { .. }
            | PipelineError::Parse { .. }
            | PipelineError::Validation(_) => ErrorClass::Validation,
            PipelineError::Query(_) => ErrorClass::Query,
            PipelineError::AnomaliesDetected { .. } => ErrorClass::Gate,
        }
    }
}
