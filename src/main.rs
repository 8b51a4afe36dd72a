use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use inventory_sync::api::{self, AppState};
use inventory_sync::config;
use inventory_sync::orchestrator::SyncOrchestrator;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let orchestrator = SyncOrchestrator::from_config(&cfg)?;
    let router = api::routes(Arc::new(AppState::new(orchestrator)));

    let addr: SocketAddr = cfg
        .app
        .bind_addr
        .parse()
        .with_context(|| format!("invalid app.bind_addr: {}", cfg.app.bind_addr))?;
    info!(%addr, "listening for sync triggers");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
