use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::RunDate;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a TOML config file. Environment variables are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run date (YYYY-MM-DD). Overrides RUN_DATE and the config file
    #[arg(long, global = true)]
    pub dt: Option<RunDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the whole chain: ingest, curate, refresh both tables, gate
    Run,

    /// Fetch every symbol and write the raw partitions
    Ingest,

    /// Build the curated CSV partition from the raw partitions
    Curate,

    /// Refresh fct_daily_returns, then fct_anomalies
    Refresh,

    /// Fail when fct_anomalies is not empty
    Gate,
}
