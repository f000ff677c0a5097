//! Telnyx webhook events
//!
//! Telnyx posts every notification as `{"data": {"event_type": ..., "payload": {...}}}`.
//! The event set grows over time, so anything not listed here parses to
//! [`VendorEvent::Unknown`] instead of failing.

use crate::domain::call::value_object::CallDirection;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::error::Result;
use serde::Deserialize;

/// Webhook request body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub event_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CallPayload {
    call_control_id: String,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    hangup_cause: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    id: String,
    #[serde(default)]
    from: Option<MessageParty>,
    #[serde(default)]
    to: Vec<MessageParty>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageParty {
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Closed set of vendor events the service reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorEvent {
    CallInitiated {
        call_control_id: String,
        direction: Option<CallDirection>,
        from: String,
        to: String,
    },
    CallRinging {
        call_control_id: String,
    },
    CallAnswered {
        call_control_id: String,
    },
    CallBridged {
        call_control_id: String,
    },
    CallHangup {
        call_control_id: String,
        cause: Option<String>,
    },
    MachineDetectionEnded {
        call_control_id: String,
        result: Option<String>,
    },
    /// `message.sent` and `message.finalized` delivery receipts
    MessageStatus {
        message_id: String,
        status: String,
    },
    MessageReceived {
        message_id: String,
        from: String,
        text: String,
    },
    Unknown(String),
}

impl VendorEvent {
    /// Classify a webhook body
    pub fn from_envelope(envelope: WebhookEnvelope) -> Result<Self> {
        let WebhookData {
            event_type,
            payload,
            ..
        } = envelope.data;

        let event = match event_type.as_str() {
            "call.initiated" => {
                let call = call_payload(&event_type, payload)?;
                VendorEvent::CallInitiated {
                    direction: call.direction.as_deref().and_then(CallDirection::from_vendor),
                    from: call.from.unwrap_or_default(),
                    to: call.to.unwrap_or_default(),
                    call_control_id: call.call_control_id,
                }
            }
            "call.ringing" => VendorEvent::CallRinging {
                call_control_id: call_payload(&event_type, payload)?.call_control_id,
            },
            "call.answered" => VendorEvent::CallAnswered {
                call_control_id: call_payload(&event_type, payload)?.call_control_id,
            },
            "call.bridged" => VendorEvent::CallBridged {
                call_control_id: call_payload(&event_type, payload)?.call_control_id,
            },
            "call.hangup" => {
                let call = call_payload(&event_type, payload)?;
                VendorEvent::CallHangup {
                    call_control_id: call.call_control_id,
                    cause: call.hangup_cause,
                }
            }
            "call.machine.detection.ended" => {
                let call = call_payload(&event_type, payload)?;
                VendorEvent::MachineDetectionEnded {
                    call_control_id: call.call_control_id,
                    result: call.result,
                }
            }
            "message.sent" | "message.finalized" => {
                let message = message_payload(&event_type, payload)?;
                let status = message
                    .to
                    .into_iter()
                    .find_map(|party| party.status)
                    .unwrap_or_else(|| event_type.trim_start_matches("message.").to_string());
                VendorEvent::MessageStatus {
                    message_id: message.id,
                    status,
                }
            }
            "message.received" => {
                let message = message_payload(&event_type, payload)?;
                VendorEvent::MessageReceived {
                    message_id: message.id,
                    from: message
                        .from
                        .and_then(|party| party.phone_number)
                        .unwrap_or_default(),
                    text: message.text.unwrap_or_default(),
                }
            }
            _ => VendorEvent::Unknown(event_type.clone()),
        };

        Ok(event)
    }

    /// Vendor event type name, used for logging and metrics labels
    pub fn name(&self) -> &str {
        match self {
            VendorEvent::CallInitiated { .. } => "call.initiated",
            VendorEvent::CallRinging { .. } => "call.ringing",
            VendorEvent::CallAnswered { .. } => "call.answered",
            VendorEvent::CallBridged { .. } => "call.bridged",
            VendorEvent::CallHangup { .. } => "call.hangup",
            VendorEvent::MachineDetectionEnded { .. } => "call.machine.detection.ended",
            VendorEvent::MessageStatus { .. } => "message.status",
            VendorEvent::MessageReceived { .. } => "message.received",
            VendorEvent::Unknown(event_type) => event_type,
        }
    }

    /// Messaging (`message.*`) events, as opposed to call-control ones
    pub fn is_messaging(&self) -> bool {
        self.name().starts_with("message.")
    }
}

fn call_payload(event_type: &str, payload: serde_json::Value) -> Result<CallPayload> {
    serde_json::from_value(payload)
        .map_err(|e| DomainError::ValidationError(format!("{} payload: {}", event_type, e)))
}

fn message_payload(event_type: &str, payload: serde_json::Value) -> Result<MessagePayload> {
    serde_json::from_value(payload)
        .map_err(|e| DomainError::ValidationError(format!("{} payload: {}", event_type, e)))
}
