//! Partition key layout of the data lake.
//!
//! ```text
//! raw/<provider>/daily/symbol=<SYMBOL>/dt=<YYYY-MM-DD>/data.json
//! curated/prices_daily_csv/dt=<YYYY-MM-DD>/prices_daily.csv
//! ```
//!
//! Keys are fully determined by their inputs, so rerunning a date rewrites the
//! same objects instead of creating new versions.

use crate::models::{RunDate, Symbol};

/// Prefix shared by every curated partition.
const CURATED_PREFIX: &str = "curated/prices_daily_csv/";

const CURATED_FILE_NAME: &str = "prices_daily.csv";
const RAW_FILE_NAME: &str = "data.json";

/// Key of the raw payload for one (provider, symbol, run date).
pub fn raw_partition_key(provider: &str, symbol: &Symbol, run_date: RunDate) -> String {
    format!("raw/{provider}/daily/symbol={symbol}/dt={run_date}/{RAW_FILE_NAME}")
}

/// Key of the curated partition for one run date.
pub fn curated_partition_key(run_date: RunDate) -> String {
    format!("{CURATED_PREFIX}dt={run_date}/{CURATED_FILE_NAME}")
}
