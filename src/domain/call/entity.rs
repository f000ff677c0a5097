//! Call session entity

use crate::domain::call::value_object::{CallDirection, SessionStatus};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live call leg tracked between webhook events, keyed by the
/// vendor's call-control id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub call_id: String,
    pub direction: CallDirection,
    pub peer_number: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub conference_id: Option<String>,
}

impl CallSession {
    pub fn new(call_id: String, direction: CallDirection, peer_number: String) -> Self {
        Self {
            call_id,
            direction,
            peer_number,
            status: SessionStatus::Ringing,
            created_at: Utc::now(),
            answered_at: None,
            conference_id: None,
        }
    }

    /// Move to a new status.
    ///
    /// `answered_at` is stamped the first time the call is picked up and
    /// kept on replays.
    pub fn set_status(&mut self, status: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(status) {
            return Err(DomainError::InvalidStateTransition(format!(
                "{} -> {} for call {}",
                self.status.as_str(),
                status.as_str(),
                self.call_id
            )));
        }

        if matches!(status, SessionStatus::Answered | SessionStatus::Bridged) {
            self.answered_at.get_or_insert_with(Utc::now);
        }
        self.status = status;
        Ok(())
    }

    /// Merge a patch into this session. A status the session cannot move
    /// to is rejected without applying any other field.
    pub fn apply(&mut self, patch: SessionPatch) -> Result<()> {
        if let Some(status) = patch.status {
            self.set_status(status)?;
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(peer_number) = patch.peer_number {
            self.peer_number = peer_number;
        }
        if let Some(conference_id) = patch.conference_id {
            self.conference_id = Some(conference_id);
        }
        Ok(())
    }
}

/// Partial update for a call session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub direction: Option<CallDirection>,
    pub peer_number: Option<String>,
    pub status: Option<SessionStatus>,
    pub conference_id: Option<String>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn conference(conference_id: String) -> Self {
        Self {
            conference_id: Some(conference_id),
            ..Default::default()
        }
    }

    /// Fields for a freshly observed call
    pub fn new_call(direction: CallDirection, peer_number: String) -> Self {
        Self {
            direction: Some(direction),
            peer_number: Some(peer_number),
            status: Some(SessionStatus::Ringing),
            conference_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_ringing() {
        let session = CallSession::new(
            "v3:abc".to_string(),
            CallDirection::Inbound,
            "+15551234567".to_string(),
        );
        assert_eq!(session.status, SessionStatus::Ringing);
        assert!(session.answered_at.is_none());
        assert!(session.conference_id.is_none());
    }

    #[test]
    fn test_answered_at_survives_replay() {
        let mut session = CallSession::new(
            "abc".to_string(),
            CallDirection::Inbound,
            "+15551234567".to_string(),
        );
        session.set_status(SessionStatus::Answered).unwrap();
        let first = session.answered_at;
        assert!(first.is_some());

        session.set_status(SessionStatus::Answered).unwrap();
        session.set_status(SessionStatus::Bridged).unwrap();
        assert_eq!(session.answered_at, first);
    }

    #[test]
    fn test_regression_is_rejected() {
        let mut session = CallSession::new(
            "abc".to_string(),
            CallDirection::Outbound,
            "+15551234567".to_string(),
        );
        session.set_status(SessionStatus::Bridged).unwrap();

        let result = session.apply(SessionPatch {
            status: Some(SessionStatus::Ringing),
            conference_id: Some("conf-1".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(DomainError::InvalidStateTransition(_))));
        assert_eq!(session.status, SessionStatus::Bridged);
        assert!(session.conference_id.is_none());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = CallSession::new(
            "abc".to_string(),
            CallDirection::Inbound,
            "+15551234567".to_string(),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["callId"], "abc");
        assert_eq!(json["peerNumber"], "+15551234567");
        assert_eq!(json["status"], "ringing");
        assert_eq!(json["direction"], "inbound");
    }
}
