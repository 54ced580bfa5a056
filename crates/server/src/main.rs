//! stratus-sw entry point.
//!
//! Boots the cache orchestrator, runs install and activate, then serves the
//! MCP tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use stratus_client::{FetchClient, FetchConfig};
use stratus_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;
mod worker;

use worker::{HeadlessHost, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(db = %config.db_path.display(), "starting stratus-sw on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .map_err(|e| anyhow!("failed to open cache at {}: {e}", config.db_path.display()))?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config)).map_err(|e| anyhow!("{e}"))?);
    let host = Arc::new(HeadlessHost::new());
    let orchestrator = Arc::new(Orchestrator::new(&config, db, fetcher, host).map_err(|e| anyhow!("{e}"))?);

    let install = orchestrator.install().await.map_err(|e| anyhow!("install failed: {e}"))?;
    tracing::info!(precached = install.precached, prewarmed = install.prewarmed, "installed");
    let activate = orchestrator.activate().await.map_err(|e| anyhow!("activate failed: {e}"))?;
    tracing::info!(
        version = %orchestrator.settings().version(),
        state = %orchestrator.state().await,
        deleted = activate.deleted.len(),
        claimed = activate.claimed,
        "ready"
    );

    let sweeper = config
        .sweep_interval()
        .map(|interval| worker::sweeper::spawn_periodic(orchestrator.sweeper().clone(), interval));

    let handler = handler::SwServer::new(orchestrator);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}
