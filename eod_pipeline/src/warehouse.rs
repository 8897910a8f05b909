//! SQL engine seam used by the refresh and gate stages.
//!
//! The pipeline only hands the engine a statement, a database name and an
//! output location, and reads rows back. [`sqlite::SqliteWarehouse`] is the
//! local engine; tests substitute their own [`QueryEngine`].

pub mod sqlite;
pub mod statements;

use async_trait::async_trait;
use thiserror::Error;

use crate::{config::PipelineConfig, store::StoreError};

pub use sqlite::SqliteWarehouse;
pub use statements::{ANOMALY_COUNT_SQL, REFRESH_ANOMALIES, REFRESH_DAILY_RETURNS, RefreshStatement, RenderedStatement};

/// Where a statement runs and where the engine may put its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub database: String,
    pub output_location: Option<String>,
}

impl QueryContext {
    pub fn new(database: impl Into<String>, output_location: Option<String>) -> Self {
        Self {
            database: database.into(),
            output_location,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.database.clone(), config.output_location.clone())
    }
}

/// One result row; `None` is SQL `NULL`.
pub type Record = Vec<Option<String>>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("statement {name} failed: {message}")]
    Execution { name: String, message: String },

    #[error("database error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("cannot open warehouse: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("cannot load curated partitions: {0}")]
    Store(#[from] StoreError),

    #[error("cannot read curated partition {key}: {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },

    #[error("warehouse connection lock poisoned")]
    Poisoned,

    #[error("warehouse task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("unexpected query result: {0}")]
    UnexpectedResult(String),
}

/// An external SQL engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Runs every SQL string of a rendered refresh statement, in order.
    async fn execute(&self, statement: &RenderedStatement, ctx: &QueryContext) -> Result<(), QueryError>;

    /// Runs a query and returns its rows as text.
    async fn fetch_records(&self, sql: &str, ctx: &QueryContext) -> Result<Vec<Record>, QueryError>;
}
