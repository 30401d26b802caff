//! Health check endpoint
//!
//! Reports service liveness plus gate and staging-area load. Returns 503
//! once the gate is saturated so load balancers stop routing new work here.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gate::GateStats;
use crate::state::AppState;
use crate::tempfiles::TempFileStats;

/// Create the health router
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    gate: GateStats,
    temp_files: TempFileStats,
}

/// GET /health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.gate().is_healthy();

    let body = Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        gate: state.gate().stats(),
        temp_files: state.temp_files().stats(),
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, body)
}
