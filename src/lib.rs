//! Realtime MQTT telemetry dashboard.
//!
//! Data flow, leaves first:
//! - [`bus`] receives MQTT messages on a background thread and pushes typed
//!   [`models::IngestionEvent`]s into the [`ingest`] channel.
//! - [`dashboard::Dashboard`] drains that channel into a
//!   [`store::TelemetryStore`] on every refresh.
//! - [`routes`] serve the rendered page, control commands, CSV export and
//!   JSON snapshots over axum.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): siblings
//! import shared types through the crate root re-exports below rather than
//! reaching into each other's internals.

use axum::Router;

pub mod bus;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod ingest;
pub mod models;
pub mod render;
pub mod routes;
pub mod store;

pub use config::Config;
pub use dashboard::{Dashboard, SharedDashboard};
pub use store::TelemetryStore;

// ---

/// Build the HTTP application around the consumer end of the channel.
///
/// Returns the router and the shared dashboard so the caller can attach a
/// drain ticker. The MQTT side is started separately with
/// [`bus::spawn_subscriber`].
pub fn build_app(config: Config, receiver: ingest::IngestReceiver) -> (Router, SharedDashboard) {
    // ---
    let dashboard = Dashboard::new(&config, receiver).shared();
    let router = routes::router(dashboard.clone(), config);
    (router, dashboard)
}
