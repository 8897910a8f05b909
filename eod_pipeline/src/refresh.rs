use std::sync::Arc;

use tracing::info;

use crate::{
    errors::PipelineError,
    models::RunDate,
    warehouse::{QueryContext, QueryEngine, RefreshStatement},
};

/// Triggers named derived-table refreshes in the SQL engine.
#[derive(Clone)]
pub struct DerivedTableRefresh {
    engine: Arc<dyn QueryEngine>,
    ctx: QueryContext,
}

impl DerivedTableRefresh {
    pub fn new(engine: Arc<dyn QueryEngine>, ctx: QueryContext) -> Self {
        Self { engine, ctx }
    }

    /// Renders `statement` for `run_date` and waits for the engine to finish it.
    pub async fn refresh(&self, statement: &RefreshStatement, run_date: RunDate) -> Result<(), PipelineError> {
        let rendered = statement.render(run_date);
        self.engine.execute(&rendered, &self.ctx).await?;
        info!(statement = statement.name, table = statement.target_table, %run_date, "refreshed");
        Ok(())
    }
}
