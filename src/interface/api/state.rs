//! Shared handler state

use crate::application::{CallControlService, Switchboard, WebhookQueue};
use crate::infrastructure::sse::EventBroadcaster;
use crate::infrastructure::telnyx::WebhookVerifier;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub calls: Arc<CallControlService>,
    pub webhooks: WebhookQueue,
    pub verifier: Arc<WebhookVerifier>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub sse_keep_alive: Duration,
    /// `None` when no recorder is installed; `/metrics` then returns 404
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        switchboard: &Switchboard,
        verifier: WebhookVerifier,
        sse_keep_alive: Duration,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            calls: switchboard.calls.clone(),
            webhooks: switchboard.webhooks(),
            verifier: Arc::new(verifier),
            broadcaster: switchboard.broadcaster.clone(),
            sse_keep_alive,
            metrics,
        }
    }
}
