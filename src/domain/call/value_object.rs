//! Call value objects

use serde::{Deserialize, Serialize};

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Call placed to the agency
    Inbound,
    /// Call placed from the CRM
    Outbound,
}

impl CallDirection {
    /// Parse the direction string Telnyx puts in call payloads
    pub fn from_vendor(value: &str) -> Option<Self> {
        match value {
            "incoming" | "inbound" => Some(CallDirection::Inbound),
            "outgoing" | "outbound" => Some(CallDirection::Outbound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }
}

/// Stored status of a live call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ringing,
    Answered,
    Bridged,
    Ended,
    /// Refused by the agent before it was answered
    Rejected,
}

impl SessionStatus {
    /// Check if state transition is valid.
    ///
    /// Re-applying the current status is allowed so that replayed webhooks
    /// are harmless.
    pub fn can_transition_to(&self, new_status: SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, new_status) {
            (Ended, _) => false,
            (Rejected, _) => false,
            (current, next) if *current == next => true,

            (Ringing, Answered) => true,
            (Ringing, Bridged) => true,
            (Ringing, Ended) => true,
            (Ringing, Rejected) => true,

            (Answered, Bridged) => true,
            (Answered, Ended) => true,

            (Bridged, Ended) => true,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Rejected)
    }

    /// Status the CRM UI shows for this session status
    pub fn ui_status(&self) -> UiCallStatus {
        match self {
            SessionStatus::Ringing => UiCallStatus::Ringing,
            SessionStatus::Answered | SessionStatus::Bridged => UiCallStatus::Connected,
            SessionStatus::Ended => UiCallStatus::Ended,
            SessionStatus::Rejected => UiCallStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ringing => "ringing",
            SessionStatus::Answered => "answered",
            SessionStatus::Bridged => "bridged",
            SessionStatus::Ended => "ended",
            SessionStatus::Rejected => "rejected",
        }
    }
}

/// Call status as observed by the CRM UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiCallStatus {
    Calling,
    Ringing,
    Connected,
    Ended,
    Rejected,
    Unknown,
}

impl UiCallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiCallStatus::Ended | UiCallStatus::Rejected)
    }

    /// Map a polled vendor call record to a UI status.
    ///
    /// A dead call is always `Ended`. For live calls the vendor state string
    /// decides; states we do not recognize fall back to what webhooks have
    /// told us about the session, if anything.
    pub fn from_vendor_state(
        is_alive: bool,
        state: Option<&str>,
        known: Option<SessionStatus>,
    ) -> Self {
        if !is_alive {
            return UiCallStatus::Ended;
        }

        match state {
            Some("parked") | Some("initiated") | Some("bridging") => UiCallStatus::Calling,
            Some("ringing") | Some("early") => UiCallStatus::Ringing,
            Some("answered") | Some("active") | Some("bridged") => UiCallStatus::Connected,
            _ => known
                .map(|status| status.ui_status())
                .unwrap_or(UiCallStatus::Unknown),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiCallStatus::Calling => "calling",
            UiCallStatus::Ringing => "ringing",
            UiCallStatus::Connected => "connected",
            UiCallStatus::Ended => "ended",
            UiCallStatus::Rejected => "rejected",
            UiCallStatus::Unknown => "unknown",
        }
    }
}
