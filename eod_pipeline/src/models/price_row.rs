//! Canonical in-memory representation of one curated daily price record.
//!
//! Every retained symbol's time series is exploded into [`PriceRow`]s by the
//! curator, and the curated CSV partition is exactly a sorted slice of them.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::symbol::Symbol;

/// Column order of the curated CSV partition.
pub const CURATED_COLUMNS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

/// A single end-of-day OHLCV record for one symbol.
///
/// Field order matters: it is the column order of the curated CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    /// The ticker this record belongs to (e.g., "AAPL").
    pub symbol: Symbol,

    /// The trading date reported by the provider.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price of the session.
    pub high: f64,

    /// Lowest price of the session.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Shares traded. The provider sometimes formats this like a float; it is
    /// truncated to an integer while parsing.
    pub volume: u64,
}

impl PriceRow {
    /// Ordering of rows inside a curated partition: by symbol, then by date.
    pub fn partition_order(&self, other: &Self) -> Ordering {
        self.symbol
            .cmp(&other.symbol)
            .then_with(|| self.date.cmp(&other.date))
    }
}

/// Sorts rows into curated partition order, `(symbol, date)` ascending.
pub fn sort_partition_rows(rows: &mut [PriceRow]) {
    rows.sort_by(PriceRow::partition_order);
}
