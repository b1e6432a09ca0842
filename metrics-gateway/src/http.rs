/**
 * HTTP SURFACE - axum router of the gateway
 *
 * - GET /favicon.ico : always 404, empty body
 * - any other path   : aggregates the whole fleet and answers 200 with the
 *                      JSON document; failures are reported in-band through
 *                      `status`/`error_code`/`error_message`
 *
 * One log line per request, tagged with version and hostname.
 */

use crate::aggregator::aggregate_fleet;
use crate::backend::MetricsBackend;
use crate::config::{GatewayConfig, UnavailableAs};
use crate::models::Host;
use crate::response::{build_response, FleetResponse, Metadata, Status};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn MetricsBackend>,
    pub hosts: Arc<[Host]>,
    pub metadata: Metadata,
    pub unavailable_as: UnavailableAs,
}

impl AppState {
    pub fn new(config: &GatewayConfig, backend: Arc<dyn MetricsBackend>, metadata: Metadata) -> Self {
        Self {
            backend,
            hosts: config.hosts.clone().into(),
            metadata,
            unavailable_as: config.unavailable_as,
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/favicon.ico", get(|| async { StatusCode::NOT_FOUND }))
        .fallback(get_metrics)
        .with_state(app_state)
}

// GET / (and every unmatched path)
async fn get_metrics(State(app): State<AppState>) -> Json<FleetResponse> {
    let snapshot = aggregate_fleet(app.backend.as_ref(), &app.hosts).await;
    let response = build_response(
        app.metadata.clone(),
        &snapshot.records,
        snapshot.ok,
        app.unavailable_as,
    );

    match response.status {
        Status::Ok => info!(
            version = %app.metadata.version,
            hostname = %app.metadata.hostname,
            "GET / OK"
        ),
        Status::Err => error!(
            version = %app.metadata.version,
            hostname = %app.metadata.hostname,
            error_code = %response.error_code,
            "GET / ERR: {}",
            response.error_message
        ),
    }

    Json(response)
}
