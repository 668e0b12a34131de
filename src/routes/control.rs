//! `POST /control/led/{state}`: publish an LED command.
//!
//! The publish runs on the blocking pool since it opens its own broker
//! connection. Either way the operator is redirected back to the dashboard
//! with a notice saying whether the command was sent or failed.

use axum::{
    extract::Path, extract::State, http::StatusCode, response::IntoResponse, response::Redirect,
    routing::post, Router,
};
use tracing::{error, info};

use super::AppState;
use crate::bus;
use crate::models::LedCommand;
use crate::render::Notice;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/control/led/{state}", post(handler))
}

async fn handler(
    Path(state): Path<String>,
    State((_, config)): State<AppState>,
) -> impl IntoResponse {
    // ---
    let Some(command) = LedCommand::from_path(&state) else {
        return (StatusCode::NOT_FOUND, format!("Unknown LED state '{}'", state)).into_response();
    };

    info!("POST /control/led/{} - publishing {}", state, command.payload());

    let result = tokio::task::spawn_blocking(move || bus::publish_command(&config, command))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);

    let notice = match result {
        Ok(()) => Notice::Sent(command),
        Err(e) => {
            error!("Failed to publish {}: {:#}", command.payload(), e);
            Notice::Failed(command)
        }
    };

    Redirect::to(&format!("/?notice={}", notice.as_query())).into_response()
}
