use clap::Parser;
use eod_pipeline::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be populated.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(&cli)?;
    let pipeline = cli::build_pipeline(&config)?;

    cli::dispatch(&pipeline, cli.command, config.run_date).await
}
