//! HTTP API for health checks and supervision status

use crate::config::ApiConfig;
use crate::error::{RelayError, RelayResult};
use crate::supervisor::{InFlightRegistry, SupervisionPhase};

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inflight: Arc<InFlightRegistry>,
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, inflight: Arc<InFlightRegistry>) -> RelayResult<()> {
    let state = AppState { inflight };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/stats", get(get_stats))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Relayer status
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        in_flight: state.inflight.total(),
    })
}

/// In-flight supervision counts per phase
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        foreground: state.inflight.count(SupervisionPhase::Foreground),
        background: state.inflight.count(SupervisionPhase::Background),
    })
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    in_flight: usize,
}

#[derive(Serialize)]
struct StatsResponse {
    foreground: usize,
    background: usize,
}
