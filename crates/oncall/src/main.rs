use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oncall_engine::{config::Config, server::Server, OnCallManager};

#[derive(Debug, Parser)]
#[command(name = "oncall-engine", version, about = "On-call rotation and alert escalation engine")]
struct Cli {
    /// Roster file (YAML or JSON); overrides ROSTER_PATH
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Listen address; overrides SERVER_ADDR
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(roster) = cli.roster {
        config.roster.path = roster;
    }
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }
    info!("Loaded configuration: {:?}", config);

    let manager = OnCallManager::from_config(&config)
        .with_context(|| format!("Failed to initialize from {}", config.roster.path.display()))?;

    let server = Server::new(Arc::new(manager));

    info!("Starting server on {}", config.server.addr);
    server.start(&config.server.addr).await?;

    Ok(())
}
