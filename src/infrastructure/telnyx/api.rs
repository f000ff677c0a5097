//! Outbound telephony port
//!
//! The application layer talks to the carrier through [`TelephonyApi`];
//! [`super::TelnyxClient`] is the production adapter.

use super::error::TelnyxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outbound call request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub to: String,
    pub from: String,
    pub webhook_url: Option<String>,
}

/// Identifiers Telnyx assigns to a new call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialResponse {
    pub call_control_id: String,
    #[serde(default)]
    pub call_leg_id: Option<String>,
    #[serde(default)]
    pub call_session_id: Option<String>,
}

/// Live call record as reported by `GET /calls/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCallStatus {
    #[serde(default)]
    pub is_alive: bool,
    #[serde(default)]
    pub state: Option<String>,
}

/// Outbound SMS request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRequest {
    pub to: String,
    pub from: String,
    pub text: String,
}

/// Accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsResponse {
    #[serde(rename = "id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelephonyApi: Send + Sync {
    async fn dial(&self, request: DialRequest) -> Result<DialResponse, TelnyxError>;

    async fn hangup(&self, call_control_id: &str) -> Result<(), TelnyxError>;

    async fn send_dtmf(&self, call_control_id: &str, digits: &str) -> Result<(), TelnyxError>;

    async fn answer(&self, call_control_id: &str) -> Result<(), TelnyxError>;

    async fn reject(&self, call_control_id: &str) -> Result<(), TelnyxError>;

    /// Create a conference named `name` around the call; returns the conference id
    async fn join_conference(&self, call_control_id: &str, name: &str) -> Result<String, TelnyxError>;

    /// Start looping audio on the call
    async fn play_audio(&self, call_control_id: &str, audio_url: &str) -> Result<(), TelnyxError>;

    async fn call_status(&self, call_control_id: &str) -> Result<VendorCallStatus, TelnyxError>;

    async fn send_sms(&self, request: SmsRequest) -> Result<SmsResponse, TelnyxError>;
}
