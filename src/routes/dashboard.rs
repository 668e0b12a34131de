//! `GET /`: one render-loop invocation.
//!
//! Drains the ingestion channel into the store, then renders the page from
//! the store's snapshot while still holding the lock.

use axum::{extract::Query, extract::State, response::Html, routing::get, Router};
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::render::{self, Notice};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/", get(handler))
}

/// Query parameters for the dashboard page.
#[derive(Debug, Deserialize)]
struct PageQuery {
    /// Set by the control and export redirects; unknown values are ignored.
    notice: Option<String>,
}

async fn handler(
    Query(params): Query<PageQuery>,
    State((dashboard, config)): State<AppState>,
) -> Html<String> {
    // ---
    let notice = params.notice.as_deref().and_then(Notice::from_query);

    let mut dashboard = dashboard.lock().await;
    let applied = dashboard.refresh();
    debug!("GET / - applied {} events", applied);

    Html(render::page(dashboard.store(), &config, notice))
}
