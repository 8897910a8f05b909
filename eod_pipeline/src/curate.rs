//! Curation: raw partitions for one run date → one sorted curated CSV.
//!
//! Per configured symbol the curator reads the raw partition and classifies it:
//!
//! - provider error / rate-limit note: abort the whole curation;
//! - no time series: warn and skip the symbol (the only tolerated gap);
//! - a time series that is not an object: abort, the payload is corrupt;
//! - series: explode into one [`PriceRow`] per reported date.
//!
//! All rows are concatenated, checked to be non-empty, sorted by
//! `(symbol, date)` and written as a single partition. Rerunning a date
//! rewrites the same key.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    errors::PipelineError,
    io::{CuratedPartitionWriter, RawPartitions},
    models::{PriceRow, RunDate, Symbol, price_row::sort_partition_rows, run_date::RUN_DATE_FORMAT},
    providers::alpha_vantage::response::{
        CLOSE_FIELD, DailyPayload, HIGH_FIELD, LOW_FIELD, OPEN_FIELD, TIME_SERIES_KEY, VOLUME_FIELD,
    },
};

const PREVIEW_ROWS: usize = 5;

// 2^63: the smallest float that no longer fits an i64.
const MAX_VOLUME: f64 = i64::MAX as f64;

/// Outcome of a successful curation.
#[derive(Debug, Clone, PartialEq)]
pub struct CurationReport {
    pub run_date: RunDate,
    /// Key of the curated partition.
    pub key: String,
    pub row_count: usize,
    /// Symbols that contributed rows, in universe order.
    pub symbols: Vec<Symbol>,
    /// Symbols skipped because their payload had no time series.
    pub skipped: Vec<Symbol>,
}

pub struct Curator {
    raw: RawPartitions,
    writer: CuratedPartitionWriter,
    symbols: Vec<Symbol>,
}

impl Curator {
    pub fn new(raw: RawPartitions, writer: CuratedPartitionWriter, symbols: Vec<Symbol>) -> Self {
        Self {
            raw,
            writer,
            symbols,
        }
    }

    /// Curates every raw partition of `run_date` into one CSV partition.
    pub async fn curate(&self, run_date: RunDate) -> Result<CurationReport, PipelineError> {
        self.raw.require_bucket()?;
        info!(%run_date, symbols = self.symbols.len(), "curation started");

        let mut rows = Vec::new();
        let mut retained = Vec::new();
        let mut skipped = Vec::new();

        for symbol in &self.symbols {
            let document = self.raw.read(symbol, run_date).await?;

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
                DailyPayload::Malformed { keys } => {
                    warn!(
                        %symbol,
                        ?keys,
                        "skipping symbol: payload has no daily time series"
                    );
                    skipped.push(symbol.clone());
                }
                DailyPayload::InvalidSeries { found } => {
                    return Err(PipelineError::Validation(format!(
                        "{symbol}: \"{TIME_SERIES_KEY}\" holds a {found}, expected an object of daily bars"
                    )));
                }
                DailyPayload::Series(series) => {
                    rows.extend(parse_daily_series(symbol, series)?);
                    retained.push(symbol.clone());
                }
            }
        }

        if rows.is_empty() {
            return Err(PipelineError::Validation(format!(
                "No valid rows to curate for {run_date}: all payloads were non-data responses or empty series"
            )));
        }

        sort_partition_rows(&mut rows);
        let key = self.writer.write(run_date, &rows).await?;

        for row in rows.iter().take(PREVIEW_ROWS) {
            info!(
                symbol = %row.symbol,
                date = %row.date,
                open = row.open,
                high = row.high,
                low = row.low,
                close = row.close,
                volume = row.volume,
                "preview"
            );
        }

        Ok(CurationReport {
            run_date,
            key,
            row_count: rows.len(),
            symbols: retained,
            skipped,
        })
    }
}

/// Explodes a provider time series into one row per reported date.
///
/// Prices must parse as finite floats. Volume is parsed as a float and
/// truncated, because the provider sometimes formats it like `"1234.0"`; it
/// must be finite, non-negative and below `i64::MAX` so it fits the
/// warehouse's INTEGER column.
pub fn parse_daily_series(
    symbol: &Symbol,
    series: &Map<String, Value>,
) -> Result<Vec<PriceRow>, PipelineError> {
    series
        .iter()
        .map(|(date, bar)| parse_bar(symbol, date, bar))
        .collect()
}

fn parse_bar(symbol: &Symbol, date: &str, bar: &Value) -> Result<PriceRow, PipelineError> {
    let parse_err = |field: &'static str, reason: String| PipelineError::Parse {
        symbol: symbol.clone(),
        date: date.to_string(),
        field,
        reason,
    };

    let day = NaiveDate::parse_from_str(date, RUN_DATE_FORMAT)
        .map_err(|e| parse_err("date", e.to_string()))?;

    let number = |field: &'static str| -> Result<f64, PipelineError> {
        let value = bar
            .get(field)
            .ok_or_else(|| parse_err(field, "field missing".into()))?;
        let parsed = match value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| parse_err(field, format!("{s:?}: {e}")))?,
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| parse_err(field, format!("{n} is not representable")))?,
            other => return Err(parse_err(field, format!("unexpected value {other}"))),
        };
        if !parsed.is_finite() {
            return Err(parse_err(field, format!("{parsed} is not finite")));
        }
        Ok(parsed)
    };

    let volume = number(VOLUME_FIELD)?;
    if volume < 0.0 {
        return Err(parse_err(VOLUME_FIELD, format!("{volume} is negative")));
    }
    if volume >= MAX_VOLUME {
        return Err(parse_err(VOLUME_FIELD, format!("{volume} exceeds {}", i64::MAX)));
    }

    Ok(PriceRow {
        symbol: symbol.clone(),
        date: day,
        open: number(OPEN_FIELD)?,
        high: number(HIGH_FIELD)?,
        low: number(LOW_FIELD)?,
        close: number(CLOSE_FIELD)?,
        volume: volume.trunc() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn aapl() -> Symbol {
        Symbol::new("AAPL").unwrap()
    }

    fn series(doc: &Value) -> &Map<String, Value> {
        doc.as_object().unwrap()
    }

    #[test]
    fn parses_string_fields_and_truncates_volume() {
        let doc = json!({
            "2026-01-29": {
                "1. open": "187.1500", "2. high": "189.0000", "3. low": "186.2000",
                "4. close": "188.0400", "5. volume": "51234567.0"
            }
        });
        let rows = parse_daily_series(&aapl(), series(&doc)).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date.to_string(), "2026-01-29");
        assert_eq!(row.open, 187.15);
        assert_eq!(row.close, 188.04);
        assert_eq!(row.volume, 51_234_567);
    }

    #[test]
    fn accepts_numeric_json_fields() {
        let doc = json!({
            "2026-01-29": { "1. open": 1.5, "2. high": 2, "3. low": 1, "4. close": 1.75, "5. volume": 99.9 }
        });
        let rows = parse_daily_series(&aapl(), series(&doc)).unwrap();
        assert_eq!(rows[0].high, 2.0);
        assert_eq!(rows[0].volume, 99);
    }

    #[test]
    fn rejects_unparseable_and_missing_fields() {
        let doc = json!({
            "2026-01-29": { "1. open": "abc", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1" }
        });
        let err = parse_daily_series(&aapl(), series(&doc)).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { field: "1. open", .. }));

        let doc = json!({ "2026-01-29": { "1. open": "1" } });
        assert!(parse_daily_series(&aapl(), series(&doc)).is_err());

        let doc = json!({ "yesterday": { "1. open": "1" } });
        let err = parse_daily_series(&aapl(), series(&doc)).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { field: "date", .. }));
    }

    #[test]
    fn rejects_negative_and_non_finite_volume() {
        let doc = json!({
            "2026-01-29": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "-5" }
        });
        assert!(parse_daily_series(&aapl(), series(&doc)).is_err());

        let doc = json!({
            "2026-01-29": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "inf" }
        });
        assert!(parse_daily_series(&aapl(), series(&doc)).is_err());

        let doc = json!({
            "2026-01-29": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1e20" }
        });
        let err = parse_daily_series(&aapl(), series(&doc)).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { field: "5. volume", .. }));

        let doc = json!({
            "2026-01-29": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "9223372036854775808" }
        });
        assert!(parse_daily_series(&aapl(), series(&doc)).is_err());

        let doc = json!({
            "2026-01-29": { "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "9000000000000000000" }
        });
        assert_eq!(
            parse_daily_series(&aapl(), series(&doc)).unwrap()[0].volume,
            9_000_000_000_000_000_000
        );
    }

    #[test]
    fn empty_series_yields_no_rows() {
        let doc = json!({});
        assert!(parse_daily_series(&aapl(), series(&doc)).unwrap().is_empty());
    }

    fn arb_row() -> impl Strategy<Value = PriceRow> {
        (
            prop::sample::select(vec!["AAPL", "MSFT", "NVDA", "TSLA"]),
            0i64..400,
            0u64..1_000_000,
        )
            .prop_map(|(sym, offset, volume)| PriceRow {
                symbol: Symbol::new(sym).unwrap(),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(offset),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume,
            })
    }

    proptest! {
        #[test]
        fn sorted_partitions_are_non_decreasing(mut rows in proptest::collection::vec(arb_row(), 0..64)) {
            let len = rows.len();
            sort_partition_rows(&mut rows);
            prop_assert_eq!(rows.len(), len);
            for pair in rows.windows(2) {
                let a = (&pair[0].symbol, pair[0].date);
                let b = (&pair[1].symbol, pair[1].date);
                prop_assert!(a <= b);
            }
        }
    }
}
