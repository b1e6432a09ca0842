//! Node Metrics Gateway
//!
//! Queries Prometheus for every node listed in `NODES` and serves the
//! aggregated result as one JSON document:
//! - configuration from the environment (`.env` honoured)
//! - one instant query per metric and node, on every request
//! - partial failures reported in-band, HTTP status stays 200

mod aggregator;
mod backend;
mod config;
mod http;
mod models;
mod query;
mod response;

use crate::backend::PrometheusBackend;
use crate::config::GatewayConfig;
use crate::http::AppState;
use crate::response::Metadata;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let metadata = Metadata::current();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(version = %metadata.version, hostname = %metadata.hostname, "{e}");
            std::process::exit(1);
        }
    };

    let backend = PrometheusBackend::new(config.prometheus_url.clone(), config.query_timeout)
        .context("Failed to create Prometheus client")?;

    let app_state = AppState::new(&config, Arc::new(backend), metadata.clone());
    let app = http::build_router(app_state);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;
    info!(
        version = %metadata.version,
        hostname = %metadata.hostname,
        nodes = config.hosts.len(),
        "Starting server on {addr}, http://{addr}"
    );
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
