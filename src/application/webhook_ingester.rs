//! Webhook ingestion
//!
//! The HTTP handler acknowledges a callback as soon as it is authenticated
//! and hands the parsed event to [`WebhookQueue`]. A single worker drains the
//! queue, so events for one call are applied in delivery order.

use crate::domain::call::{
    CallDirection, CallEvent, CallSessionRegistry, SessionPatch, SessionStatus, UiCallStatus,
    VendorEvent,
};
use crate::infrastructure::sse::EventBroadcaster;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Applies vendor events to the registry and notifies browser clients
pub struct WebhookIngester {
    registry: Arc<CallSessionRegistry>,
    broadcaster: Arc<EventBroadcaster>,
}

impl WebhookIngester {
    pub fn new(registry: Arc<CallSessionRegistry>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Apply one event. Never fails: problems are logged and the event dropped.
    pub async fn process(&self, event: VendorEvent) {
        counter!("switchboard_webhook_events_total", "event" => event.name().to_string()).increment(1);

        match event {
            VendorEvent::CallInitiated {
                call_control_id,
                direction,
                from,
                to,
            } => match direction {
                Some(CallDirection::Inbound) => {
                    if self.registry.has_ended(&call_control_id).await {
                        debug!(call_control_id = %call_control_id, "Ignoring replayed call.initiated");
                        return;
                    }
                    let session = self
                        .registry
                        .upsert(
                            &call_control_id,
                            SessionPatch::new_call(CallDirection::Inbound, from.clone()),
                        )
                        .await;
                    if session.status.is_terminal() {
                        debug!(call_control_id = %call_control_id, status = session.status.as_str(), "call.initiated after terminal status");
                        return;
                    }
                    info!(call_control_id = %call_control_id, from = %from, to = %to, "Incoming call");
                    self.broadcaster
                        .broadcast(&CallEvent::incoming_call(&call_control_id, &from, &to));
                }
                _ => {
                    debug!(call_control_id = %call_control_id, "Outbound call initiated");
                }
            },
            VendorEvent::CallRinging { call_control_id } => {
                self.apply_status(&call_control_id, SessionStatus::Ringing).await;
            }
            VendorEvent::CallAnswered { call_control_id } => {
                self.apply_status(&call_control_id, SessionStatus::Answered).await;
            }
            VendorEvent::CallBridged { call_control_id } => {
                self.apply_status(&call_control_id, SessionStatus::Bridged).await;
            }
            VendorEvent::CallHangup {
                call_control_id,
                cause,
            } => {
                let replayed = self.registry.has_ended(&call_control_id).await;
                let removed = self.registry.remove(&call_control_id).await;
                info!(
                    call_control_id = %call_control_id,
                    cause = cause.as_deref().unwrap_or("unknown"),
                    tracked = removed.is_some(),
                    "Call ended"
                );
                match removed {
                    // Rejected calls already showed their final status.
                    Some(session) if session.status.is_terminal() => {
                        debug!(call_control_id = %call_control_id, status = session.status.as_str(), "Hangup after terminal status");
                    }
                    None if replayed => {
                        debug!(call_control_id = %call_control_id, "Ignoring replayed hangup");
                    }
                    _ => {
                        self.broadcaster
                            .broadcast(&CallEvent::call_status(&call_control_id, UiCallStatus::Ended));
                    }
                }
            }
            VendorEvent::MachineDetectionEnded {
                call_control_id,
                result,
            } => {
                // A hint only: the stored status waits for call.answered/bridged.
                if self.is_finished(&call_control_id).await {
                    debug!(call_control_id = %call_control_id, "Machine detection after call finished");
                } else if result.as_deref() == Some("human") {
                    self.broadcaster.broadcast(&CallEvent::call_status(
                        &call_control_id,
                        UiCallStatus::Connected,
                    ));
                } else {
                    debug!(
                        call_control_id = %call_control_id,
                        result = result.as_deref().unwrap_or("none"),
                        "Machine detection did not find a human"
                    );
                }
            }
            VendorEvent::MessageStatus { message_id, status } => {
                info!(message_id = %message_id, status = %status, "SMS delivery update");
                self.broadcaster
                    .broadcast(&CallEvent::sms_status(&message_id, &status));
            }
            VendorEvent::MessageReceived {
                message_id,
                from,
                text,
            } => {
                info!(message_id = %message_id, from = %from, "SMS received");
                self.broadcaster
                    .broadcast(&CallEvent::sms_received(&message_id, &from, &text));
            }
            VendorEvent::Unknown(event_type) => {
                debug!(event_type = %event_type, "Ignoring unhandled webhook event");
            }
        }
    }

    /// Update a tracked call and announce what the UI should now show.
    /// Untracked calls are announced with the reported status unless they
    /// have just ended; a finished call announces nothing more.
    async fn apply_status(&self, call_control_id: &str, status: SessionStatus) {
        let shown = match self.registry.update_status(call_control_id, status).await {
            Some(session) if session.status.is_terminal() => {
                debug!(call_control_id = %call_control_id, status = status.as_str(), "Status after terminal state ignored");
                return;
            }
            Some(session) => {
                debug!(call_control_id = %call_control_id, status = session.status.as_str(), "Call status updated");
                session.status.ui_status()
            }
            None => {
                if self.registry.has_ended(call_control_id).await {
                    debug!(call_control_id = %call_control_id, status = status.as_str(), "Late status for ended call ignored");
                    return;
                }
                debug!(call_control_id = %call_control_id, status = status.as_str(), "Status for untracked call");
                status.ui_status()
            }
        };
        self.broadcaster
            .broadcast(&CallEvent::call_status(call_control_id, shown));
    }

    async fn is_finished(&self, call_control_id: &str) -> bool {
        if self.registry.has_ended(call_control_id).await {
            return true;
        }
        self.registry
            .get(call_control_id)
            .await
            .is_some_and(|session| session.status.is_terminal())
    }

    /// Start the worker task. Dropping every [`WebhookQueue`] clone stops it.
    pub fn spawn(self: Arc<Self>, capacity: usize) -> (WebhookQueue, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<VendorEvent>(capacity.max(1));

        let handle = tokio::spawn(async move {
            info!("Webhook worker started");
            while let Some(event) = rx.recv().await {
                self.process(event).await;
            }
            info!("Webhook worker stopped");
        });

        (WebhookQueue { tx }, handle)
    }
}

/// Sending side of the webhook worker
#[derive(Clone)]
pub struct WebhookQueue {
    tx: mpsc::Sender<VendorEvent>,
}

impl WebhookQueue {
    /// Queue an event without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, event: VendorEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(event = event.name(), "Webhook queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(event = event.name(), "Webhook worker stopped, dropping event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sse::Subscription;
    use std::time::Duration;

    struct Harness {
        ingester: WebhookIngester,
        registry: Arc<CallSessionRegistry>,
        subscription: Subscription,
    }

    impl Harness {
        async fn new() -> Self {
            let registry = Arc::new(CallSessionRegistry::new());
            let broadcaster = Arc::new(EventBroadcaster::new(32));
            let mut subscription = broadcaster.subscribe();
            subscription.recv().await.unwrap(); // connected frame
            Self {
                ingester: WebhookIngester::new(registry.clone(), broadcaster),
                registry,
                subscription,
            }
        }

        /// Frames emitted so far
        fn frames(&mut self) -> Vec<serde_json::Value> {
            let mut frames = Vec::new();
            while let Some(frame) = self.subscription.try_recv() {
                frames.push(serde_json::from_str(&frame).unwrap());
            }
            frames
        }
    }

    fn inbound(id: &str) -> VendorEvent {
        VendorEvent::CallInitiated {
            call_control_id: id.to_string(),
            direction: Some(CallDirection::Inbound),
            from: "+15550001111".to_string(),
            to: "+15550002222".to_string(),
        }
    }

    fn hangup(id: &str) -> VendorEvent {
        VendorEvent::CallHangup {
            call_control_id: id.to_string(),
            cause: Some("normal_clearing".to_string()),
        }
    }

    #[tokio::test]
    async fn test_inbound_call_is_tracked_and_announced() {
        let mut h = Harness::new().await;
        h.ingester.process(inbound("abc")).await;

        let session = h.registry.get("abc").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ringing);
        assert_eq!(session.direction, CallDirection::Inbound);

        let frames = h.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "incoming_call");
        assert_eq!(frames[0]["callControlId"], "abc");
    }

    #[tokio::test]
    async fn test_outbound_initiated_is_ignored() {
        let mut h = Harness::new().await;
        h.ingester
            .process(VendorEvent::CallInitiated {
                call_control_id: "out".to_string(),
                direction: Some(CallDirection::Outbound),
                from: "+15550002222".to_string(),
                to: "+15550001111".to_string(),
            })
            .await;

        assert!(h.registry.get("out").await.is_none());
        assert!(h.frames().is_empty());
    }

    #[tokio::test]
    async fn test_answer_then_hangup() {
        let mut h = Harness::new().await;
        h.ingester
            .process(VendorEvent::CallAnswered {
                call_control_id: "abc".to_string(),
            })
            .await;
        h.ingester.process(hangup("abc")).await;

        assert!(h.registry.get("abc").await.is_none());

        let frames = h.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "call_status");
        assert_eq!(frames[0]["status"], "connected");
        assert_eq!(frames[1]["type"], "call_status");
        assert_eq!(frames[1]["status"], "ended");
    }

    #[tokio::test]
    async fn test_hangup_removes_regardless_of_state() {
        let h = Harness::new().await;
        let updates: [fn(String) -> VendorEvent; 3] = [
            |call_control_id| VendorEvent::CallRinging { call_control_id },
            |call_control_id| VendorEvent::CallAnswered { call_control_id },
            |call_control_id| VendorEvent::CallBridged { call_control_id },
        ];
        for (i, update) in updates.into_iter().enumerate() {
            let id = format!("a{}", i);
            h.ingester.process(inbound(&id)).await;
            h.ingester.process(update(id.clone())).await;
            h.ingester.process(hangup(&id)).await;
            assert!(h.registry.get(&id).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_duplicate_deliveries_are_idempotent() {
        let h = Harness::new().await;
        let answered = VendorEvent::CallAnswered {
            call_control_id: "abc".to_string(),
        };

        h.ingester.process(inbound("abc")).await;
        h.ingester.process(answered.clone()).await;
        let once = h.registry.list().await;

        h.ingester.process(inbound("abc")).await;
        h.ingester.process(answered.clone()).await;
        h.ingester.process(answered).await;
        assert_eq!(h.registry.list().await, once);
    }

    #[tokio::test]
    async fn test_replayed_hangup_does_not_resurrect() {
        let mut h = Harness::new().await;
        h.ingester.process(inbound("abc")).await;
        h.ingester.process(hangup("abc")).await;
        h.ingester.process(hangup("abc")).await;
        h.ingester.process(inbound("abc")).await;
        h.ingester
            .process(VendorEvent::CallAnswered {
                call_control_id: "abc".to_string(),
            })
            .await;
        assert!(h.registry.is_empty().await);

        let frames = h.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "incoming_call");
        assert_eq!(frames[1]["status"], "ended");
    }

    #[tokio::test]
    async fn test_hangup_after_reject_is_silent() {
        let mut h = Harness::new().await;
        h.ingester.process(inbound("abc")).await;
        h.registry
            .upsert("abc", SessionPatch::status(SessionStatus::Rejected))
            .await;
        h.frames();

        h.ingester
            .process(VendorEvent::CallRinging {
                call_control_id: "abc".to_string(),
            })
            .await;
        h.ingester.process(hangup("abc")).await;

        assert!(h.registry.is_empty().await);
        assert!(h.frames().is_empty());
    }

    #[tokio::test]
    async fn test_late_events_after_hangup_are_silent() {
        let mut h = Harness::new().await;
        h.ingester.process(inbound("abc")).await;
        h.ingester.process(hangup("abc")).await;
        h.frames();

        h.ingester
            .process(VendorEvent::CallAnswered {
                call_control_id: "abc".to_string(),
            })
            .await;
        h.ingester
            .process(VendorEvent::CallBridged {
                call_control_id: "abc".to_string(),
            })
            .await;
        h.ingester
            .process(VendorEvent::MachineDetectionEnded {
                call_control_id: "abc".to_string(),
                result: Some("human".to_string()),
            })
            .await;

        assert!(h.frames().is_empty());
    }

    #[tokio::test]
    async fn test_untracked_status_is_still_announced() {
        let mut h = Harness::new().await;
        h.ingester
            .process(VendorEvent::CallAnswered {
                call_control_id: "elsewhere".to_string(),
            })
            .await;

        let frames = h.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["status"], "connected");
    }

    #[tokio::test]
    async fn test_machine_detection_human_is_a_hint() {
        let mut h = Harness::new().await;
        h.ingester.process(inbound("abc")).await;
        h.frames();

        h.ingester
            .process(VendorEvent::MachineDetectionEnded {
                call_control_id: "abc".to_string(),
                result: Some("human".to_string()),
            })
            .await;
        h.ingester
            .process(VendorEvent::MachineDetectionEnded {
                call_control_id: "abc".to_string(),
                result: Some("machine".to_string()),
            })
            .await;

        assert_eq!(h.registry.get("abc").await.unwrap().status, SessionStatus::Ringing);
        let frames = h.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["status"], "connected");
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let mut h = Harness::new().await;
        h.ingester
            .process(VendorEvent::Unknown("call.recording.saved".to_string()))
            .await;
        assert!(h.frames().is_empty());
        assert!(h.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_sms_receipts_are_broadcast() {
        let mut h = Harness::new().await;
        h.ingester
            .process(VendorEvent::MessageStatus {
                message_id: "msg-1".to_string(),
                status: "delivered".to_string(),
            })
            .await;

        let frames = h.frames();
        assert_eq!(frames[0]["type"], "sms_status");
        assert_eq!(frames[0]["messageId"], "msg-1");
        assert_eq!(frames[0]["status"], "delivered");
    }

    #[tokio::test]
    async fn test_worker_applies_events_in_order() {
        let registry = Arc::new(CallSessionRegistry::new());
        let broadcaster = Arc::new(EventBroadcaster::new(32));
        let mut subscription = broadcaster.subscribe();
        subscription.recv().await.unwrap();

        let ingester = Arc::new(WebhookIngester::new(registry.clone(), broadcaster));
        let (queue, worker) = ingester.spawn(16);

        assert!(queue.enqueue(inbound("abc")));
        assert!(queue.enqueue(VendorEvent::CallAnswered {
            call_control_id: "abc".to_string(),
        }));
        assert!(queue.enqueue(hangup("abc")));

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let frame = tokio::time::timeout(Duration::from_secs(2), subscription.recv())
                .await
                .unwrap()
                .unwrap();
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            kinds.push(format!(
                "{}:{}",
                json["type"].as_str().unwrap(),
                json["status"].as_str().unwrap_or("")
            ));
        }
        assert_eq!(kinds, vec!["incoming_call:", "call_status:connected", "call_status:ended"]);
        assert!(registry.is_empty().await);

        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
