//! Events pushed to CRM browser clients

use crate::domain::call::value_object::UiCallStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A status-change notification, serialized as one SSE `data:` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    /// First frame on every new event stream
    #[serde(rename_all = "camelCase")]
    Connected { client_id: u64, timestamp: i64 },

    #[serde(rename_all = "camelCase")]
    IncomingCall {
        call_control_id: String,
        from: String,
        to: String,
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    CallStatus {
        call_control_id: String,
        status: UiCallStatus,
        timestamp: i64,
    },

    /// Delivery receipt for an outbound SMS
    #[serde(rename_all = "camelCase")]
    SmsStatus {
        message_id: String,
        status: String,
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    SmsReceived {
        message_id: String,
        from: String,
        text: String,
        timestamp: i64,
    },
}

impl CallEvent {
    pub fn connected(client_id: u64) -> Self {
        CallEvent::Connected {
            client_id,
            timestamp: now_millis(),
        }
    }

    pub fn incoming_call(call_control_id: &str, from: &str, to: &str) -> Self {
        CallEvent::IncomingCall {
            call_control_id: call_control_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn call_status(call_control_id: &str, status: UiCallStatus) -> Self {
        CallEvent::CallStatus {
            call_control_id: call_control_id.to_string(),
            status,
            timestamp: now_millis(),
        }
    }

    pub fn sms_status(message_id: &str, status: &str) -> Self {
        CallEvent::SmsStatus {
            message_id: message_id.to_string(),
            status: status.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn sms_received(message_id: &str, from: &str, text: &str) -> Self {
        CallEvent::SmsReceived {
            message_id: message_id.to_string(),
            from: from.to_string(),
            text: text.to_string(),
            timestamp: now_millis(),
        }
    }

    /// Frame type name, as it appears in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            CallEvent::Connected { .. } => "connected",
            CallEvent::IncomingCall { .. } => "incoming_call",
            CallEvent::CallStatus { .. } => "call_status",
            CallEvent::SmsStatus { .. } => "sms_status",
            CallEvent::SmsReceived { .. } => "sms_received",
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_frame_shape() {
        let event = CallEvent::call_status("abc", UiCallStatus::Connected);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "call_status");
        assert_eq!(json["callControlId"], "abc");
        assert_eq!(json["status"], "connected");
        assert!(json["timestamp"].is_i64());
        assert_eq!(event.kind(), "call_status");
    }

    #[test]
    fn test_connected_frame_carries_client_id() {
        let json = serde_json::to_value(CallEvent::connected(1_700_000_000_000)).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["clientId"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_incoming_call_frame_round_trips() {
        let event = CallEvent::incoming_call("abc", "+15550001111", "+15550002222");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: CallEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
