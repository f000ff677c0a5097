//! Server-Sent Events fan-out to CRM browser clients
//!
//! Every client gets its own bounded queue. A broadcast serializes the event
//! once and offers the frame to each queue without waiting: a full queue
//! loses that frame, a closed queue unregisters its client. One slow or dead
//! client never holds up the rest.

use crate::domain::call::CallEvent;
use futures::Stream;
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Serialized SSE frame payload, shared between all client queues
pub type Frame = Arc<str>;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients a write was attempted on
    pub attempted: usize,
    pub delivered: usize,
    /// Frames lost because the client queue was full
    pub dropped: usize,
    /// Clients found gone and unregistered
    pub disconnected: usize,
}

/// Registry of open event streams
pub struct EventBroadcaster {
    clients: Mutex<HashMap<u64, mpsc::Sender<Frame>>>,
    last_client_id: AtomicU64,
    client_buffer: usize,
}

impl EventBroadcaster {
    /// Create a broadcaster whose clients each buffer up to `client_buffer` frames
    pub fn new(client_buffer: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            last_client_id: AtomicU64::new(0),
            client_buffer: client_buffer.max(1),
        }
    }

    /// Open a new client stream.
    ///
    /// The stream starts with a `connected` frame carrying the client id and
    /// unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let client_id = self.next_client_id();
        let (tx, rx) = mpsc::channel(self.client_buffer);

        if let Some(frame) = encode(&CallEvent::connected(client_id)) {
            // Fresh queue with capacity >= 1, cannot be full.
            let _ = tx.try_send(frame);
        }

        let count = {
            let mut clients = self.clients();
            clients.insert(client_id, tx);
            clients.len()
        };
        gauge!("switchboard_sse_clients").set(count as f64);
        info!(client_id, clients = count, "SSE client connected");

        Subscription {
            client_id,
            rx,
            broadcaster: Arc::clone(self),
        }
    }

    /// Offer `event` to every registered client
    pub fn broadcast(&self, event: &CallEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let Some(frame) = encode(event) else {
            return report;
        };

        let mut clients = self.clients();
        let mut gone = Vec::new();

        for (client_id, tx) in clients.iter() {
            report.attempted += 1;
            match tx.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    counter!("switchboard_sse_frames_dropped_total").increment(1);
                    warn!(client_id = *client_id, event = event.kind(), "SSE client lagging, frame dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    report.disconnected += 1;
                    gone.push(*client_id);
                }
            }
        }

        for client_id in &gone {
            clients.remove(client_id);
            debug!(client_id = *client_id, "Removed closed SSE client");
        }
        if !gone.is_empty() {
            gauge!("switchboard_sse_clients").set(clients.len() as f64);
        }

        debug!(
            event = event.kind(),
            attempted = report.attempted,
            delivered = report.delivered,
            "Broadcast event"
        );
        report
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    /// Disconnect every client. Their streams end once queued frames drain.
    pub fn close_all(&self) {
        let closed = {
            let mut clients = self.clients();
            let closed = clients.len();
            clients.clear();
            closed
        };
        gauge!("switchboard_sse_clients").set(0.0);
        info!(clients = closed, "Closed all SSE clients");
    }

    fn unregister(&self, client_id: u64) {
        let count = {
            let mut clients = self.clients();
            clients.remove(&client_id);
            clients.len()
        };
        gauge!("switchboard_sse_clients").set(count as f64);
        info!(client_id, clients = count, "SSE client disconnected");
    }

    /// Millisecond timestamp, bumped so ids stay strictly increasing
    fn next_client_id(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_client_id.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_client_id.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<Frame>>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

fn encode(event: &CallEvent) -> Option<Frame> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// One client's view of the broadcast. Yields serialized frames.
pub struct Subscription {
    client_id: u64,
    rx: mpsc::Receiver<Frame>,
    broadcaster: Arc<EventBroadcaster>,
}

impl Subscription {
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Wait for the next frame
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Next frame if one is already queued
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.client_id);
    }
}
