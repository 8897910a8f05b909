//! The run as an explicit finite-state machine.
//!
//! ```text
//! Pending → IngestRunning → CurateRunning → ReturnsRefreshRunning
//!         → AnomaliesRefreshRunning → GateRunning → Succeeded
//! ```
//!
//! Any running state may move to `Failed`. A stage starts only after its
//! predecessor succeeded, a failure stops the chain and nothing is rolled
//! back: raw and curated partitions already written stay in place, and a
//! rerun of the same date overwrites them.

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::{Instrument, error, info, info_span};

use crate::{
    config::PipelineConfig,
    curate::{CurationReport, Curator},
    errors::{ErrorClass, PipelineError},
    gate::AnomalyGate,
    ingest::{IngestReport, IngestionOrchestrator},
    io::{CuratedPartitionWriter, RawPartitions},
    models::RunDate,
    providers::DataProvider,
    refresh::DerivedTableRefresh,
    store::ObjectStore,
    warehouse::{QueryContext, QueryEngine, REFRESH_ANOMALIES, REFRESH_DAILY_RETURNS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingest,
    Curate,
    RefreshReturns,
    RefreshAnomalies,
    Gate,
}

impl Stage {
    /// Stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Ingest,
        Stage::Curate,
        Stage::RefreshReturns,
        Stage::RefreshAnomalies,
        Stage::Gate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest_raw_prices",
            Stage::Curate => "curate_prices_csv",
            Stage::RefreshReturns => "refresh_fct_daily_returns",
            Stage::RefreshAnomalies => "refresh_fct_anomalies",
            Stage::Gate => "check_anomalies",
        }
    }

    pub fn next(self) -> Option<Stage> {
        let idx = Stage::ALL.iter().position(|s| *s == self)?;
        Stage::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Pending,
    IngestRunning,
    CurateRunning,
    ReturnsRefreshRunning,
    AnomaliesRefreshRunning,
    GateRunning,
    Succeeded,
    Failed {
        stage: Stage,
        class: ErrorClass,
        reason: String,
    },
}

impl PipelineState {
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Ingest => PipelineState::IngestRunning,
            Stage::Curate => PipelineState::CurateRunning,
            Stage::RefreshReturns => PipelineState::ReturnsRefreshRunning,
            Stage::RefreshAnomalies => PipelineState::AnomaliesRefreshRunning,
            Stage::Gate => PipelineState::GateRunning,
        }
    }

    pub fn running_stage(&self) -> Option<Stage> {
        match self {
            PipelineState::IngestRunning => Some(Stage::Ingest),
            PipelineState::CurateRunning => Some(Stage::Curate),
            PipelineState::ReturnsRefreshRunning => Some(Stage::RefreshReturns),
            PipelineState::AnomaliesRefreshRunning => Some(Stage::RefreshAnomalies),
            PipelineState::GateRunning => Some(Stage::Gate),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed { .. })
    }

    /// The state after the current stage succeeded. Terminal and pending
    /// states do not advance.
    pub fn succeed(&self) -> Option<PipelineState> {
        match self.running_stage()?.next() {
            Some(next) => Some(PipelineState::running(next)),
            None => Some(PipelineState::Succeeded),
        }
    }

    /// The state after the current stage failed with `error`.
    pub fn fail(&self, error: &PipelineError) -> Option<PipelineState> {
        let stage = self.running_stage()?;
        Some(PipelineState::Failed {
            stage,
            class: error.class(),
            reason: error.to_string(),
        })
    }
}

/// What a successful stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Ingested(IngestReport),
    Curated(CurationReport),
    Refreshed { statement: &'static str },
    GatePassed { anomalies: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_date: RunDate,
    /// Every state the run visited, starting with `Pending`.
    pub history: Vec<PipelineState>,
    pub outcomes: Vec<StageOutcome>,
}

impl RunReport {
    pub fn final_state(&self) -> Option<&PipelineState> {
        self.history.last()
    }
}

#[derive(Debug, Error)]
#[error("run for {} failed in {stage}: {error}", .report.run_date)]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
    pub report: RunReport,
}

pub struct Pipeline {
    ingest: IngestionOrchestrator,
    curator: Curator,
    refresh: DerivedTableRefresh,
    gate: AnomalyGate,
}

impl Pipeline {
    pub fn new(
        ingest: IngestionOrchestrator,
        curator: Curator,
        refresh: DerivedTableRefresh,
        gate: AnomalyGate,
    ) -> Self {
        Self {
            ingest,
            curator,
            refresh,
            gate,
        }
    }

    /// Wires every stage from one configuration value.
    pub fn from_config(
        config: &PipelineConfig,
        store: Arc<dyn ObjectStore>,
        provider: Arc<dyn DataProvider>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        let raw = RawPartitions::new(Arc::clone(&store), config.bucket.clone(), provider.code());
        let writer = CuratedPartitionWriter::new(store, config.bucket.clone());
        let ctx = QueryContext::from_config(config);

        Self::new(
            IngestionOrchestrator::new(provider, raw.clone(), config.symbols.clone()),
            Curator::new(raw, writer, config.symbols.clone()),
            DerivedTableRefresh::new(Arc::clone(&engine), ctx.clone()),
            AnomalyGate::new(engine, ctx),
        )
    }

    /// Runs one stage on its own, without checking its predecessors.
    pub async fn run_stage(&self, stage: Stage, run_date: RunDate) -> Result<StageOutcome, PipelineError> {
        match stage {
            Stage::Ingest => self.ingest.ingest_all(run_date).await.map(StageOutcome::Ingested),
            Stage::Curate => self.curator.curate(run_date).await.map(StageOutcome::Curated),
            Stage::RefreshReturns => {
                self.refresh.refresh(&REFRESH_DAILY_RETURNS, run_date).await?;
                Ok(StageOutcome::Refreshed {
                    statement: REFRESH_DAILY_RETURNS.name,
                })
            }
            Stage::RefreshAnomalies => {
                self.refresh.refresh(&REFRESH_ANOMALIES, run_date).await?;
                Ok(StageOutcome::Refreshed {
                    statement: REFRESH_ANOMALIES.name,
                })
            }
            Stage::Gate => self
                .gate
                .check_anomalies(run_date)
                .await
                .map(|anomalies| StageOutcome::GatePassed { anomalies }),
        }
    }

    /// Runs the whole chain for `run_date`, stopping at the first failure.
    pub async fn run(&self, run_date: RunDate) -> Result<RunReport, RunFailure> {
        let mut report = RunReport {
            run_date,
            history: vec![PipelineState::Pending],
            outcomes: Vec::new(),
        };
        let mut state = PipelineState::running(Stage::Ingest);

        while let Some(stage) = state.running_stage() {
            report.history.push(state.clone());
            let span = info_span!("stage", stage = stage.name(), %run_date);

            match self.run_stage(stage, run_date).instrument(span).await {
                Ok(outcome) => {
                    info!(%stage, %run_date, "stage succeeded");
                    report.outcomes.push(outcome);
                    state = state.succeed().unwrap_or(PipelineState::Succeeded);
                }
                Err(error) => {
                    error!(%stage, %run_date, class = ?error.class(), %error, "stage failed");
                    if let Some(failed) = state.fail(&error) {
                        report.history.push(failed);
                    }
                    return Err(RunFailure { stage, error, report });
                }
            }
        }

        report.history.push(state);
        info!(%run_date, "pipeline succeeded");
        Ok(report)
    }
}
