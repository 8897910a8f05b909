#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use eod_pipeline::{
    io::RawPartitions,
    models::{RunDate, Symbol},
    providers::{DataProvider, MissingCredentialSnafu, ProviderError},
    store::{InMemoryObjectStore, ObjectStore, StoreError},
    warehouse::{QueryContext, QueryEngine, QueryError, Record, RenderedStatement},
};
use serde_json::{Map, Value, json};

pub const BUCKET: &str = "lake";

pub fn dt() -> RunDate {
    "2026-01-29".parse().unwrap()
}

pub fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

pub fn symbols(list: &[&str]) -> Vec<Symbol> {
    list.iter().map(|s| sym(s)).collect()
}

/// A `TIME_SERIES_DAILY` document. Bars are `(date, close)`; dates are
/// emitted in the given order, newest first like the provider does.
pub fn series_payload(symbol: &str, bars: &[(&str, f64)]) -> Value {
    let mut series = Map::new();
    for (date, close) in bars {
        series.insert(
            date.to_string(),
            json!({
                "1. open": format!("{close:.4}"),
                "2. high": format!("{:.4}", close + 1.0),
                "3. low": format!("{:.4}", close - 1.0),
                "4. close": format!("{close:.4}"),
                "5. volume": "1000",
            }),
        );
    }
    json!({
        "Meta Data": {
            "1. Information": "Daily Prices (open, high, low, close) and Volumes",
            "2. Symbol": symbol,
            "3. Last Refreshed": "2026-01-29",
        },
        "Time Series (Daily)": series,
    })
}

pub fn calm_payload(symbol: &str) -> Value {
    series_payload(symbol, &[("2026-01-29", 102.0), ("2026-01-28", 101.0), ("2026-01-27", 100.0)])
}

pub fn spike_payload(symbol: &str) -> Value {
    series_payload(symbol, &[("2026-01-29", 130.0), ("2026-01-28", 100.0)])
}

/// Looks like data but has no time series.
pub fn missing_series_payload(symbol: &str) -> Value {
    json!({ "Meta Data": { "2. Symbol": symbol } })
}

pub fn rate_limit_payload() -> Value {
    json!({
        "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day."
    })
}

pub fn error_payload() -> Value {
    json!({ "Error Message": "Invalid API call. Please retry or visit the documentation for TIME_SERIES_DAILY." })
}

/// Serves canned documents per symbol and records every fetch.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, payload: Value) -> Self {
        self.responses.insert(symbol.to_string(), payload);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    fn code(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_daily(&self, symbol: &Symbol) -> Result<Value, ProviderError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        match self.responses.get(symbol.as_str()) {
            Some(payload) => Ok(payload.clone()),
            None => MissingCredentialSnafu.fail(),
        }
    }
}

/// Records executed statements and answers every query with fixed records.
#[derive(Default)]
pub struct FakeQueryEngine {
    executed: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
    records: Vec<Record>,
    fail_statement: Option<&'static str>,
}

impl FakeQueryEngine {
    pub fn with_count(count: u64) -> Self {
        Self {
            records: vec![vec![Some(count.to_string())]],
            ..Self::default()
        }
    }

    pub fn failing(mut self, statement: &'static str) -> Self {
        self.fail_statement = Some(statement);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for FakeQueryEngine {
    async fn execute(&self, statement: &RenderedStatement, _ctx: &QueryContext) -> Result<(), QueryError> {
        self.executed.lock().unwrap().push(statement.name.to_string());
        if self.fail_statement == Some(statement.name) {
            return Err(QueryError::Execution {
                name: statement.name.to_string(),
                message: "FAILED: table not found".into(),
            });
        }
        Ok(())
    }

    async fn fetch_records(&self, sql: &str, _ctx: &QueryContext) -> Result<Vec<Record>, QueryError> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.records.clone())
    }
}

/// Delegates to an in-memory store but refuses writes under `curated/`.
#[derive(Default)]
pub struct CuratedWriteFailingStore {
    pub inner: InMemoryObjectStore,
}

#[async_trait]
impl ObjectStore for CuratedWriteFailingStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        if key.starts_with("curated/") {
            return Err(StoreError::Io {
                path: Path::new(key).to_path_buf(),
                source: std::io::Error::other("upload refused"),
            });
        }
        self.inner.put(bucket, key, body, content_type).await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get(bucket, key).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list(bucket, prefix).await
    }
}

/// Writes raw partitions directly, bypassing ingestion.
pub async fn seed_raw(store: Arc<dyn ObjectStore>, payloads: &[(&str, Value)]) -> RawPartitions {
    let raw = RawPartitions::new(store, BUCKET, "alphavantage");
    for (symbol, payload) in payloads {
        raw.write(&sym(symbol), dt(), payload).await.unwrap();
    }
    raw
}
