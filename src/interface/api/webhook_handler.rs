//! Telnyx webhook endpoints
//!
//! Authentication failures are answered with 401. Anything that gets past
//! authentication is acknowledged with `200 {"received": true}` before it is
//! processed; payloads that cannot be parsed, or that belong to the other
//! endpoint, are logged and dropped.

use super::dto::WebhookAck;
use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::domain::call::{VendorEvent, WebhookEnvelope};
use crate::infrastructure::telnyx::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use tracing::{debug, warn};

/// Call-control webhook (`call.*` events)
pub async fn telnyx_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    receive(&state, &headers, &body, Channel::Call)
}

/// Messaging webhook (`message.*` delivery receipts and inbound SMS)
pub async fn telnyx_sms_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    receive(&state, &headers, &body, Channel::Sms)
}

/// Which webhook endpoint a callback arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Call,
    Sms,
}

impl Channel {
    fn as_str(&self) -> &'static str {
        match self {
            Channel::Call => "call",
            Channel::Sms => "sms",
        }
    }

    fn accepts(&self, event: &VendorEvent) -> bool {
        match self {
            Channel::Call => !event.is_messaging(),
            Channel::Sms => event.is_messaging(),
        }
    }
}

fn receive(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    channel: Channel,
) -> ApiResult<Json<WebhookAck>> {
    let channel_name = channel.as_str();

    state
        .verifier
        .verify(
            header(headers, TIMESTAMP_HEADER),
            header(headers, SIGNATURE_HEADER),
            body,
        )
        .map_err(|e| {
            warn!(channel = channel_name, "Webhook authentication failed: {}", e);
            ApiError::Unauthorized(format!("Invalid webhook signature: {}", e))
        })?;

    match parse(body) {
        Ok(event) if !channel.accepts(&event) => {
            warn!(channel = channel_name, event = event.name(), "Dropping webhook sent to the wrong endpoint");
        }
        Ok(event) => {
            debug!(channel = channel_name, event = event.name(), "Webhook received");
            state.webhooks.enqueue(event);
        }
        Err(reason) => warn!(channel = channel_name, "Dropping unreadable webhook: {}", reason),
    }

    Ok(Json(WebhookAck { received: true }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse(body: &[u8]) -> Result<VendorEvent, String> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    VendorEvent::from_envelope(envelope).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hangup() {
        let body = br#"{"data":{"event_type":"call.hangup","payload":{"call_control_id":"abc","hangup_cause":"normal_clearing"}}}"#;
        let event = parse(body).unwrap();
        assert_eq!(event.name(), "call.hangup");
    }

    #[test]
    fn test_channels_only_accept_their_events() {
        let hangup = parse(br#"{"data":{"event_type":"call.hangup","payload":{"call_control_id":"abc"}}}"#).unwrap();
        let receipt = parse(br#"{"data":{"event_type":"message.finalized","payload":{"id":"msg-1","to":[{"status":"delivered"}]}}}"#).unwrap();

        assert!(Channel::Call.accepts(&hangup));
        assert!(!Channel::Sms.accepts(&hangup));
        assert!(Channel::Sms.accepts(&receipt));
        assert!(!Channel::Call.accepts(&receipt));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse(b"not json").is_err());
        assert!(parse(br#"{"data":{}}"#).is_err());
    }
}
