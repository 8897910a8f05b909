mod common;

use std::sync::Arc;

use eod_pipeline::{
    errors::{ErrorClass, PipelineError},
    ingest::IngestionOrchestrator,
    io::RawPartitions,
    store::{InMemoryObjectStore, StoreError},
};

use common::{
    BUCKET, ScriptedProvider, calm_payload, dt, error_payload, missing_series_payload,
    rate_limit_payload, symbols,
};

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    store: Arc<InMemoryObjectStore>,
    universe: &[&str],
) -> IngestionOrchestrator {
    let raw = RawPartitions::new(store, BUCKET, "alphavantage");
    IngestionOrchestrator::new(provider, raw, symbols(universe))
}

#[tokio::test]
async fn writes_one_raw_partition_per_symbol_in_order() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with("AAPL", calm_payload("AAPL"))
            .with("MSFT", calm_payload("MSFT")),
    );
    let store = Arc::new(InMemoryObjectStore::new());

    let report = orchestrator(provider.clone(), store.clone(), &["AAPL", "MSFT"])
        .ingest_all(dt())
        .await
        .unwrap();

    assert_eq!(
        report.written,
        vec![
            "raw/alphavantage/daily/symbol=AAPL/dt=2026-01-29/data.json",
            "raw/alphavantage/daily/symbol=MSFT/dt=2026-01-29/data.json",
        ]
    );
    assert_eq!(provider.calls(), vec!["AAPL", "MSFT"]);

    let body = store.object(BUCKET, &report.written[0]).unwrap().body;
    let stored: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stored, calm_payload("AAPL"));
}

#[tokio::test]
async fn rate_limit_note_aborts_before_later_symbols() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with("AAPL", calm_payload("AAPL"))
            .with("MSFT", rate_limit_payload())
            .with("TSLA", calm_payload("TSLA")),
    );
    let store = Arc::new(InMemoryObjectStore::new());

    let err = orchestrator(provider.clone(), store.clone(), &["AAPL", "MSFT", "TSLA"])
        .ingest_all(dt())
        .await
        .unwrap_err();

    assert!(matches!(&err, PipelineError::RateLimited { symbol, .. } if symbol.as_str() == "MSFT"));
    assert_eq!(err.class(), ErrorClass::Provider);
    assert_eq!(provider.calls(), vec!["AAPL", "MSFT"]);
    assert_eq!(
        store.put_log(),
        vec!["raw/alphavantage/daily/symbol=AAPL/dt=2026-01-29/data.json"]
    );
}

#[tokio::test]
async fn provider_error_message_aborts() {
    let provider = Arc::new(ScriptedProvider::new().with("AAPL", error_payload()));
    let store = Arc::new(InMemoryObjectStore::new());

    let err = orchestrator(provider, store.clone(), &["AAPL"])
        .ingest_all(dt())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Alpha Vantage error for AAPL"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn payload_without_series_is_written_verbatim() {
    let provider = Arc::new(ScriptedProvider::new().with("TSLA", missing_series_payload("TSLA")));
    let store = Arc::new(InMemoryObjectStore::new());

    let report = orchestrator(provider, store.clone(), &["TSLA"])
        .ingest_all(dt())
        .await
        .unwrap();

    let body = store.object(BUCKET, &report.written[0]).unwrap().body;
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), missing_series_payload("TSLA"));
}

#[tokio::test]
async fn rerun_overwrites_the_same_keys() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with("AAPL", calm_payload("AAPL"))
            .with("NVDA", calm_payload("NVDA")),
    );
    let store = Arc::new(InMemoryObjectStore::new());
    let ingest = orchestrator(provider, store.clone(), &["AAPL", "NVDA"]);

    let first = ingest.ingest_all(dt()).await.unwrap();
    let second = ingest.ingest_all(dt()).await.unwrap();

    assert_eq!(first.written, second.written);
    assert_eq!(store.len(), 2);
    assert_eq!(store.put_log().len(), 4);
}

#[tokio::test]
async fn missing_bucket_fails_before_fetching() {
    let provider = Arc::new(ScriptedProvider::new().with("AAPL", calm_payload("AAPL")));
    let store = Arc::new(InMemoryObjectStore::new());
    let raw = RawPartitions::new(store.clone(), "", "alphavantage");

    let err = IngestionOrchestrator::new(provider.clone(), raw, symbols(&["AAPL"]))
        .ingest_all(dt())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(StoreError::MissingBucket)));
    assert_eq!(err.class(), ErrorClass::Validation);
    assert!(provider.calls().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn fetch_failure_names_the_symbol() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(InMemoryObjectStore::new());

    let err = orchestrator(provider, store, &["AAPL"])
        .ingest_all(dt())
        .await
        .unwrap_err();

    assert!(matches!(&err, PipelineError::Fetch { symbol, .. } if symbol.as_str() == "AAPL"));
}
