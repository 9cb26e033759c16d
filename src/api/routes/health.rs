//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// The scheduler is in-process and needs no upstream, so the server is
/// ready as soon as it is serving.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Upstream credentials that are missing degrade, rather than fail, the
/// status: the affected endpoints answer with a misconfiguration error.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let places_ok = state.places.is_configured();
    let auth_ok = state.login.is_configured();
    let store_ok = state.evaluator.is_some();

    let snapshot = state.scheduler.snapshot().await;

    Json(HealthResponse {
        status: if places_ok && auth_ok && store_ok { "healthy" } else { "degraded" }.to_string(),
        places: component(places_ok),
        auth: component(auth_ok),
        achievement_store: component(store_ok),
        visible_toasts: snapshot.toasts.len(),
        pending_toasts: snapshot.pending,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn component(configured: bool) -> String {
    if configured { "ok" } else { "unconfigured" }.to_string()
}
