//! shellcache server entry point.
//!
//! Boots the caching layer, runs install and activate, then serves MCP tools
//! on stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(version = %config.version, origin = %config.app_origin, "starting shellcache on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let state = Arc::new(state::ShellState::new(config, db, network)?);

    state.lifecycle.install().await.context("install failed")?;
    state.lifecycle.activate().await.context("activation failed")?;

    let handler = handler::ShellServer::new(Arc::clone(&state));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    state.gateway.executor().settle().await;
    tracing::info!("shut down");

    Ok(())
}
