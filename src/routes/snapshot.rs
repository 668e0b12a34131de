//! `GET /api/snapshot`: the dashboard state as JSON.
//!
//! Same refresh as the HTML page; the `recent` array is the chart window.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::models::Reading;

// ---

#[derive(Serialize)]
struct SnapshotResponse {
    connected: bool,
    last: Option<Reading>,
    recent: Vec<Reading>,
    buffered: usize,
    capacity: usize,
    total_received: u64,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/snapshot", get(handler))
}

async fn handler(State((dashboard, config)): State<AppState>) -> Json<SnapshotResponse> {
    // ---
    let mut dashboard = dashboard.lock().await;
    dashboard.refresh();

    let store = dashboard.store();
    Json(SnapshotResponse {
        connected: store.is_connected(),
        last: store.snapshot_last().cloned(),
        recent: store
            .snapshot_recent(config.chart_window)
            .into_iter()
            .cloned()
            .collect(),
        buffered: store.len(),
        capacity: store.capacity(),
        total_received: store.total_ingested(),
    })
}
