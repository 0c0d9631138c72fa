//! Health check endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/herakles-io/herakles-sysperf-exporter | More info: https://www.herakles.io | Support: proc-mem@herakles.io";

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");
    state.health_stats.record_http_request();

    let cache = state.cache.read().await;

    let status = if cache.update_success && cache.last_updated.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let message = if cache.is_updating {
        "OK - Sample in progress".to_string()
    } else if cache.update_success {
        "OK".to_string()
    } else {
        match &cache.report {
            Some(report) => format!("Last sample incomplete: {}", report.errors.join("; ")),
            None => "No sample taken yet".to_string(),
        }
    };

    let last_sample = cache
        .report
        .as_ref()
        .map_or("never", |r| r.sampled_at.as_str())
        .to_string();
    drop(cache);

    let table = state.health_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\nlast sample: {last_sample}\n\n{table}\n{FOOTER_TEXT}"),
    )
}
