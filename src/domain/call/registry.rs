//! In-memory registry of live call sessions
//!
//! Nothing is persisted: a restart loses live-call state, and the vendor
//! stays the source of truth for whether a call exists. Sessions are removed
//! on hangup; only the ids of recently ended calls are remembered, so late
//! webhooks for them can be recognized.

use crate::domain::call::entity::{CallSession, SessionPatch};
use crate::domain::call::value_object::{CallDirection, SessionStatus};
use metrics::gauge;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

/// How many ended call ids are remembered
const ENDED_CALLS_REMEMBERED: usize = 1024;

/// Live sessions keyed by call-control id
#[derive(Default)]
pub struct CallSessionRegistry {
    sessions: RwLock<HashMap<String, CallSession>>,
    ended: RwLock<EndedCalls>,
}

/// Bounded set of removed call ids, oldest evicted first
#[derive(Default)]
struct EndedCalls {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl EndedCalls {
    fn record(&mut self, call_id: &str) {
        if !self.ids.insert(call_id.to_string()) {
            return;
        }
        self.order.push_back(call_id.to_string());
        if self.order.len() > ENDED_CALLS_REMEMBERED {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}

impl CallSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `patch` into the session for `call_id`, creating it if absent.
    ///
    /// A status change the session cannot make is skipped and the stored
    /// session returned unchanged.
    pub async fn upsert(&self, call_id: &str, patch: SessionPatch) -> CallSession {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        let session = sessions.entry(call_id.to_string()).or_insert_with(|| {
            CallSession::new(
                call_id.to_string(),
                patch.direction.unwrap_or(CallDirection::Inbound),
                patch.peer_number.clone().unwrap_or_default(),
            )
        });

        if let Err(e) = session.apply(patch) {
            debug!(call_control_id = %call_id, "Skipping session update: {}", e);
        }

        let session = session.clone();
        if sessions.len() != before {
            gauge!("switchboard_active_calls").set(sessions.len() as f64);
        }
        session
    }

    /// Update the status of an existing session. Returns `None` when the
    /// call is not tracked; never creates a session.
    pub async fn update_status(&self, call_id: &str, status: SessionStatus) -> Option<CallSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(call_id)?;

        if let Err(e) = session.set_status(status) {
            debug!(call_control_id = %call_id, "Ignoring out-of-order status: {}", e);
        }

        Some(session.clone())
    }

    /// Record the conference bridge of an existing session
    pub async fn set_conference(&self, call_id: &str, conference_id: String) -> Option<CallSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(call_id)?;
        // A patch without a status cannot fail.
        let _ = session.apply(SessionPatch::conference(conference_id));
        Some(session.clone())
    }

    /// Delete the session and remember the call as ended; no-op if absent
    pub async fn remove(&self, call_id: &str) -> Option<CallSession> {
        let (removed, count) = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(call_id);
            (removed, sessions.len())
        };
        self.ended.write().await.record(call_id);
        gauge!("switchboard_active_calls").set(count as f64);
        removed
    }

    /// Whether `call_id` was removed recently
    pub async fn has_ended(&self, call_id: &str) -> bool {
        self.ended.read().await.ids.contains(call_id)
    }

    pub async fn get(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.read().await.get(call_id).cloned()
    }

    /// Snapshot of every live session, oldest first
    pub async fn list(&self) -> Vec<CallSession> {
        let mut sessions: Vec<CallSession> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
