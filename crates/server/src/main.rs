//! DevTrack REST API Server
//!
//! Serves the ticket API from whichever store is configured.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devtrack::{DevtrackConfig, TicketService};

#[derive(Parser, Debug)]
#[command(name = "devtrack-server")]
#[command(about = "HTTP API for the DevTrack ticket tracker", long_about = None)]
#[command(version)]
struct Args {
    /// Socket address to listen on
    #[arg(long, env = "DEVTRACK_BIND")]
    bind: Option<String>,

    /// Storage URL: memory, file:<path>, or sqlite:<path>
    #[arg(long, env = "DEVTRACK_STORAGE")]
    storage: Option<String>,

    /// Path to a TOML config file
    #[arg(long, env = "DEVTRACK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = DevtrackConfig::load_or_default(args.config.as_deref())?;
    let storage = config.storage_config(args.storage.as_deref())?;

    info!("Starting DevTrack API server with storage {}", storage);
    let service = Arc::new(TicketService::new(
        storage
            .open()
            .with_context(|| format!("Failed to open storage {}", storage))?,
    ));

    let app = devtrack_server::build_app(service);

    let addr = args.bind.unwrap_or_else(|| config.bind());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
