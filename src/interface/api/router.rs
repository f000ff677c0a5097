//! API Router configuration

use super::calls_handler::{
    answer_call, get_active_calls, get_call_status, hangup_call, place_call, reject_call,
    send_bulk_sms, send_dtmf, send_sms,
};
use super::events_handler::events_stream;
use super::metrics_handler::{health_check, metrics_handler};
use super::state::AppState;
use super::webhook_handler::{telnyx_sms_webhook, telnyx_webhook};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    // Health and metrics (no auth required)
    let ops_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    // Call control routes
    let call_routes = Router::new()
        .route("/api/telnyx/call", post(place_call))
        .route("/api/telnyx/hangup", post(hangup_call))
        .route("/api/telnyx/dtmf", post(send_dtmf))
        .route("/api/telnyx/answer/:call_control_id", post(answer_call))
        .route("/api/telnyx/reject/:call_control_id", post(reject_call))
        .route("/api/telnyx/call/:call_control_id/status", get(get_call_status))
        .route("/api/telnyx/calls", get(get_active_calls))
        .route("/api/telnyx/events", get(events_stream));

    // SMS routes
    let sms_routes = Router::new()
        .route("/api/telnyx/sms/send", post(send_sms))
        .route("/api/telnyx/sms/bulk", post(send_bulk_sms));

    // Vendor callbacks (authenticated by signature)
    let webhook_routes = Router::new()
        .route("/webhook/telnyx", post(telnyx_webhook))
        .route("/webhook/telnyx/sms", post(telnyx_sms_webhook));

    Router::new()
        .merge(ops_routes)
        .merge(call_routes)
        .merge(sms_routes)
        .merge(webhook_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
