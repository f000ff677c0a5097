//! Telnyx API DTOs
//!
//! Field names are camelCase on the wire to match the CRM front end.

use crate::application::{AnswerOutcome, BulkSmsSummary};
use crate::domain::call::UiCallStatus;
use crate::infrastructure::telnyx::{DialResponse, SmsResponse};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Acknowledgement of a command with no payload
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCallRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCallResponse {
    pub success: bool,
    pub call_control_id: String,
    pub call_leg_id: Option<String>,
    pub call_session_id: Option<String>,
}

impl From<DialResponse> for PlaceCallResponse {
    fn from(dial: DialResponse) -> Self {
        PlaceCallResponse {
            success: true,
            call_control_id: dial.call_control_id,
            call_leg_id: dial.call_leg_id,
            call_session_id: dial.call_session_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangupRequest {
    #[serde(default)]
    pub call_control_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtmfRequest {
    #[serde(default)]
    pub call_control_id: String,
    #[serde(default)]
    pub digits: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusResponse {
    pub success: bool,
    pub call_control_id: String,
    pub status: UiCallStatus,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub success: bool,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<SmsResponse> for SendSmsResponse {
    fn from(sms: SmsResponse) -> Self {
        SendSmsResponse {
            success: true,
            message_id: sms.message_id,
            status: sms.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkSmsRequest {
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct BulkSmsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: BulkSmsSummary,
}

/// Reply to a vendor webhook
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}
