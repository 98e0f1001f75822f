//! folio-sw server entry point.
//!
//! Boots configuration, the partition store and the caching proxy, runs
//! install and activation, then serves the proxy over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use folio_client::{CacheProxy, FetchClient, FetchConfig, ProxyOptions};
use folio_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let options = ProxyOptions::from_config(&config)?;
    let proxy = Arc::new(CacheProxy::new(db, Arc::new(fetcher), options));

    tracing::info!(version = %proxy.version(), origin = %config.origin, "starting folio-sw on stdio transport");

    let install = proxy.install().await?;
    tracing::info!(
        static_cached = install.static_assets.cached.len(),
        runtime_cached = install.runtime_assets.cached.len(),
        failed = install.failed_count(),
        "install complete"
    );
    let activation = proxy.activate().await?;
    tracing::info!(evicted = ?activation.deleted, "activation complete");

    let handler = handler::FolioServer::new(proxy);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
