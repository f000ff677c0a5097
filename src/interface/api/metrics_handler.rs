//! Prometheus metrics handler

use super::dto::ApiResponse;
use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "switchboard_webhook_events_total",
        "Telnyx webhook events processed, by event type"
    );
    describe_gauge!(
        "switchboard_active_calls",
        "Number of call sessions currently tracked"
    );
    describe_gauge!(
        "switchboard_sse_clients",
        "Number of connected SSE clients"
    );
    describe_counter!(
        "switchboard_sse_frames_dropped_total",
        "SSE frames dropped because a client's buffer was full"
    );
    describe_counter!(
        "switchboard_vendor_requests_total",
        "Requests made to the Telnyx API, by action and outcome"
    );

    Ok(handle)
}

/// HTTP metrics handler
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Liveness probe
pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}
