//! Latest sample as JSON.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Handler for the /report endpoint.
#[instrument(skip(state))]
pub async fn report_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /report request");
    state.health_stats.record_http_request();

    let cache = state.cache.read().await;
    let Some(report) = &cache.report else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [("Content-Type", "text/plain; charset=utf-8")],
            "No sample taken yet".to_string(),
        );
    };

    match serde_json::to_string_pretty(report) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "application/json")],
            body,
        ),
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                "Failed to serialize report".to_string(),
            )
        }
    }
}
