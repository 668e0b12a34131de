//! Route gateway (EMBP): each sibling module exports a subrouter and this
//! module merges them, so `main.rs` never sees individual
//! endpoints.

use axum::Router;

use crate::{Config, SharedDashboard};

mod control;
mod dashboard;
mod export;
mod health;
mod snapshot;

// ---

/// State shared by every handler.
pub type AppState = (SharedDashboard, Config);

pub fn router(dashboard: SharedDashboard, config: Config) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(control::router())
        .merge(export::router())
        .merge(snapshot::router())
        .merge(health::router())
        .with_state((dashboard, config))
}
