use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use inventory_sync::config;
use inventory_sync::orchestrator::SyncOrchestrator;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one full inventory sync to Dataverse and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log records instead of sending them, regardless of app.dry_run
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::read(Some(&args.config))?;
    if args.dry_run {
        cfg.app.dry_run = true;
    }
    config::validate(&cfg)?;

    let orchestrator = SyncOrchestrator::from_config(&cfg)?;
    let outcome = orchestrator.run_full_sync().await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.is_successful() {
        info!(items_processed = outcome.items_processed(), "sync completed");
        Ok(())
    } else {
        error!(error = ?outcome.error_message(), "sync failed");
        std::process::exit(1);
    }
}
