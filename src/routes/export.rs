//! `GET /export.csv`: download the full buffered history.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use tracing::{error, info};

use super::AppState;
use crate::export;
use crate::render::Notice;

// ---

/// File name offered to the browser.
const EXPORT_FILE_NAME: &str = "telemetry_log.csv";

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/export.csv", get(handler))
}

async fn handler(State((dashboard, _)): State<AppState>) -> impl IntoResponse {
    // ---
    let mut dashboard = dashboard.lock().await;
    dashboard.refresh();

    let store = dashboard.store();
    if store.is_empty() {
        info!("GET /export.csv - buffer empty");
        return Redirect::to(&format!("/?notice={}", Notice::ExportEmpty.as_query()))
            .into_response();
    }

    match export::to_csv(store.readings()) {
        Ok(body) => {
            info!("GET /export.csv - {} rows, {} bytes", store.len(), body.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                    ),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to export CSV: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export CSV").into_response()
        }
    }
}
