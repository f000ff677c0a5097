//! Service wiring
//!
//! Owns the shared registry and broadcaster, the webhook worker, and the
//! call control service built on top of them.

use super::call_control::{CallControlService, CallControlSettings};
use super::webhook_ingester::{WebhookIngester, WebhookQueue};
use crate::config::Config;
use crate::domain::call::CallSessionRegistry;
use crate::infrastructure::sse::EventBroadcaster;
use crate::infrastructure::telnyx::TelephonyApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Switchboard {
    pub registry: Arc<CallSessionRegistry>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub calls: Arc<CallControlService>,
    webhooks: WebhookQueue,
    worker: JoinHandle<()>,
}

impl Switchboard {
    /// Build the services and start the webhook worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, api: Option<Arc<dyn TelephonyApi>>) -> Self {
        let registry = Arc::new(CallSessionRegistry::new());
        let broadcaster = Arc::new(EventBroadcaster::new(config.sse.client_buffer));

        let ingester = Arc::new(WebhookIngester::new(registry.clone(), broadcaster.clone()));
        let (webhooks, worker) = ingester.spawn(config.webhook.queue_capacity);

        let settings = CallControlSettings {
            default_from: config.telnyx.phone_number.clone(),
            default_webhook_url: config.telnyx.webhook_url.clone(),
            hold_audio_url: config.telnyx.hold_audio_url.clone(),
            bulk_sms_delay: Duration::from_millis(config.sms.bulk_delay_ms),
        };
        if api.is_none() {
            warn!("TELNYX_API_KEY is not set; call and SMS actions will return 503");
        }
        let calls = Arc::new(CallControlService::new(
            api,
            registry.clone(),
            broadcaster.clone(),
            settings,
        ));

        info!("Switchboard started");
        Self {
            registry,
            broadcaster,
            calls,
            webhooks,
            worker,
        }
    }

    pub fn webhooks(&self) -> WebhookQueue {
        self.webhooks.clone()
    }

    /// Stop accepting webhooks and let the worker drain what is queued.
    ///
    /// Clones of the queue handed out by [`Switchboard::webhooks`] keep the
    /// worker alive until they are dropped as well.
    pub async fn shutdown(self, timeout: Duration) {
        let Self {
            webhooks, worker, ..
        } = self;
        drop(webhooks);

        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(())) => info!("Webhook worker drained"),
            Ok(Err(e)) => warn!("Webhook worker ended abnormally: {}", e),
            Err(_) => warn!("Webhook worker did not drain within {:?}", timeout),
        }
    }
}
