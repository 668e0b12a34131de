// src/routes/health.rs
//! Health check endpoint for the telemetry dashboard.
//!
//! `/health` is used by container orchestrators and CI to verify that the
//! service responds. The HTTP status is always 200 while the process is up;
//! broker connectivity is reported in the body rather than as a failure,
//! since the dashboard stays usable (history, export) while the bus is down.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    bus_connected: bool,
    buffered: usize,
    pending: usize,
}

/// Handle `GET /health`.
///
/// Does not drain the ingestion channel; `pending` reports how many events
/// are waiting for the next refresh.
async fn health(State((dashboard, _)): State<AppState>) -> Json<HealthResponse> {
    // ---
    let dashboard = dashboard.lock().await;
    Json(HealthResponse {
        status: "ok",
        bus_connected: dashboard.store().is_connected(),
        buffered: dashboard.store().len(),
        pending: dashboard.pending(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
