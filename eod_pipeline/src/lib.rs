//! Daily end-of-day price pipeline.
//!
//! One run per [`RunDate`](models::RunDate), five stages in a strict chain:
//!
//! 1. [`ingest`]: fetch each symbol from Alpha Vantage and write the raw JSON
//!    partition.
//! 2. [`curate`]: merge the raw partitions into one sorted CSV partition.
//! 3. / 4. [`refresh`]: rebuild `fct_daily_returns`, then `fct_anomalies`.
//! 5. [`gate`]: fail the run when `fct_anomalies` is not empty.
//!
//! [`pipeline::Pipeline`] drives the chain as an explicit state machine.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod curate;
pub mod errors;
pub mod gate;
pub mod ingest;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod refresh;
pub mod store;
pub mod warehouse;
