//! Command-line surface of the `eod-pipeline` binary.

pub mod commands;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

pub use commands::{Cli, Commands};

use crate::{
    config::{ConfigError, PipelineConfig},
    models::RunDate,
    pipeline::{Pipeline, Stage, StageOutcome},
    providers::alpha_vantage::AlphaVantageProvider,
    store::{FsObjectStore, ObjectStore},
    warehouse::SqliteWarehouse,
};

/// Builds the configuration from `--config` (or the environment) and `--dt`.
pub fn load_config(cli: &Cli) -> Result<PipelineConfig, ConfigError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load_path(path)?,
        None => PipelineConfig::from_env()?,
    };
    Ok(match cli.dt {
        Some(dt) => config.with_run_date(dt),
        None => config,
    })
}

/// Wires the local lake, the Alpha Vantage fetcher and the SQLite warehouse.
pub fn build_pipeline(config: &PipelineConfig) -> anyhow::Result<Pipeline> {
    info!(
        region = %config.region,
        bucket = %config.bucket,
        database = %config.database,
        run_date = %config.run_date,
        symbols = config.symbols.len(),
        lake_root = %config.lake_root.display(),
        "pipeline configured"
    );
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&config.lake_root));
    let provider = AlphaVantageProvider::from_config(config).context("building Alpha Vantage client")?;
    let engine = SqliteWarehouse::open(&config.warehouse_db, Arc::clone(&store), config.bucket.clone())
        .with_context(|| format!("opening warehouse {}", config.warehouse_db))?;

    Ok(Pipeline::from_config(
        config,
        store,
        Arc::new(provider),
        Arc::new(engine),
    ))
}

/// Runs `command` for `run_date`.
pub async fn dispatch(pipeline: &Pipeline, command: Commands, run_date: RunDate) -> anyhow::Result<()> {
    let stages: &[Stage] = match command {
        Commands::Run => {
            let report = pipeline.run(run_date).await?;
            info!(%run_date, states = report.history.len(), "run finished");
            return Ok(());
        }
        Commands::Ingest => &[Stage::Ingest],
        Commands::Curate => &[Stage::Curate],
        Commands::Refresh => &[Stage::RefreshReturns, Stage::RefreshAnomalies],
        Commands::Gate => &[Stage::Gate],
    };

    for &stage in stages {
        let outcome = pipeline
            .run_stage(stage, run_date)
            .await
            .with_context(|| format!("{stage} failed for {run_date}"))?;
        log_outcome(stage, &outcome);
    }
    Ok(())
}

fn log_outcome(stage: Stage, outcome: &StageOutcome) {
    match outcome {
        StageOutcome::Ingested(report) => {
            info!(%stage, written = report.written.len(), "raw partitions written")
        }
        StageOutcome::Curated(report) => info!(
            %stage,
            key = %report.key,
            rows = report.row_count,
            skipped = report.skipped.len(),
            "curated partition written"
        ),
        StageOutcome::Refreshed { statement } => info!(%stage, statement, "refreshed"),
        StageOutcome::GatePassed { anomalies } => info!(%stage, anomalies, "gate passed"),
    }
}
