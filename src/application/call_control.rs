//! CRM call and SMS actions
//!
//! Every action makes its vendor request once. Vendor failures go back to
//! the caller unchanged apart from naming the action; nothing is retried.

use crate::domain::call::{
    CallDirection, CallEvent, CallSession, CallSessionRegistry, SessionPatch, SessionStatus,
    UiCallStatus,
};
use crate::infrastructure::sse::EventBroadcaster;
use crate::infrastructure::telnyx::{
    DialRequest, DialResponse, SmsRequest, SmsResponse, TelephonyApi, TelnyxError,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallControlError {
    #[error("Failed to {action}: {source}")]
    Vendor {
        action: &'static str,
        source: TelnyxError,
    },

    #[error("Failed to {action}: {reason}")]
    InvalidRequest { action: &'static str, reason: String },
}

impl CallControlError {
    fn invalid(action: &'static str, reason: impl Into<String>) -> Self {
        CallControlError::InvalidRequest {
            action,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CallControlError>;

const PLACE_CALL: &str = "initiate call";
const HANGUP: &str = "hang up call";
const SEND_DTMF: &str = "send DTMF";
const ANSWER: &str = "answer call";
const REJECT: &str = "reject call";
const CALL_STATUS: &str = "get call status";
const SEND_SMS: &str = "send SMS";
const SEND_BULK_SMS: &str = "send bulk SMS";

/// Static settings for [`CallControlService`]
#[derive(Debug, Clone)]
pub struct CallControlSettings {
    /// Caller id and SMS sender used when a request names none
    pub default_from: Option<String>,
    pub default_webhook_url: Option<String>,
    pub hold_audio_url: Option<String>,
    /// Pause between sends of a bulk SMS
    pub bulk_sms_delay: Duration,
}

impl Default for CallControlSettings {
    fn default() -> Self {
        Self {
            default_from: None,
            default_webhook_url: None,
            hold_audio_url: None,
            bulk_sms_delay: Duration::from_millis(350),
        }
    }
}

/// How the caller's media was kept alive after answering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPath {
    Conference,
    HoldAudio,
    None,
}

/// Result of one step of the post-answer media setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    Succeeded(T),
    Failed(TelnyxError),
    Skipped,
}

/// Both steps of the post-answer media setup, for logging and the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSetup {
    pub conference: StepOutcome<String>,
    pub hold_audio: StepOutcome<()>,
}

impl MediaSetup {
    pub fn path(&self) -> MediaPath {
        match (&self.conference, &self.hold_audio) {
            (StepOutcome::Succeeded(_), _) => MediaPath::Conference,
            (_, StepOutcome::Succeeded(())) => MediaPath::HoldAudio,
            _ => MediaPath::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub call_control_id: String,
    pub media: MediaPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSmsResult {
    pub to: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkSmsSummary {
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<BulkSmsResult>,
}

pub struct CallControlService {
    api: Option<Arc<dyn TelephonyApi>>,
    registry: Arc<CallSessionRegistry>,
    broadcaster: Arc<EventBroadcaster>,
    settings: CallControlSettings,
}

impl CallControlService {
    /// `api` is `None` when no API key is configured; every action then
    /// fails with [`TelnyxError::NotConfigured`].
    pub fn new(
        api: Option<Arc<dyn TelephonyApi>>,
        registry: Arc<CallSessionRegistry>,
        broadcaster: Arc<EventBroadcaster>,
        settings: CallControlSettings,
    ) -> Self {
        Self {
            api,
            registry,
            broadcaster,
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    fn api(&self, action: &'static str) -> Result<&Arc<dyn TelephonyApi>> {
        self.api.as_ref().ok_or(CallControlError::Vendor {
            action,
            source: TelnyxError::NotConfigured,
        })
    }

    fn sender(&self, action: &'static str, from: Option<String>) -> Result<String> {
        from.filter(|f| !f.trim().is_empty())
            .or_else(|| self.settings.default_from.clone())
            .ok_or_else(|| CallControlError::invalid(action, "no sender number given or configured"))
    }

    /// Place an outbound call and start tracking it
    pub async fn place_call(
        &self,
        to: &str,
        from: Option<String>,
        webhook_url: Option<String>,
    ) -> Result<DialResponse> {
        let api = self.api(PLACE_CALL)?;
        let to = require(PLACE_CALL, "to", to)?;
        let from = self.sender(PLACE_CALL, from)?;

        let response = api
            .dial(DialRequest {
                to: to.to_string(),
                from,
                webhook_url: webhook_url.or_else(|| self.settings.default_webhook_url.clone()),
            })
            .await
            .map_err(|source| vendor(PLACE_CALL, source))?;

        self.registry
            .upsert(
                &response.call_control_id,
                SessionPatch::new_call(CallDirection::Outbound, to.to_string()),
            )
            .await;
        info!(call_control_id = %response.call_control_id, to = %to, "Outbound call placed");

        Ok(response)
    }

    /// The session is dropped when the `call.hangup` webhook arrives
    pub async fn hangup(&self, call_control_id: &str) -> Result<()> {
        let api = self.api(HANGUP)?;
        let call_control_id = require(HANGUP, "callControlId", call_control_id)?;

        api.hangup(call_control_id)
            .await
            .map_err(|source| vendor(HANGUP, source))?;
        info!(call_control_id = %call_control_id, "Hangup requested");
        Ok(())
    }

    pub async fn send_dtmf(&self, call_control_id: &str, digits: &str) -> Result<()> {
        let api = self.api(SEND_DTMF)?;
        let call_control_id = require(SEND_DTMF, "callControlId", call_control_id)?;
        if !is_valid_dtmf(digits) {
            return Err(CallControlError::invalid(
                SEND_DTMF,
                "digits may only contain 0-9, *, #, A-D and w/W pauses",
            ));
        }

        api.send_dtmf(call_control_id, digits)
            .await
            .map_err(|source| vendor(SEND_DTMF, source))
    }

    /// Answer an incoming call, then keep its media alive.
    ///
    /// Only the answer itself can fail the request. The call is moved into
    /// a conference bridge; if that fails, hold audio is played instead.
    /// Failures of either step are logged.
    pub async fn answer(&self, call_control_id: &str) -> Result<AnswerOutcome> {
        let api = self.api(ANSWER)?;
        let call_control_id = require(ANSWER, "callControlId", call_control_id)?;

        api.answer(call_control_id)
            .await
            .map_err(|source| vendor(ANSWER, source))?;
        info!(call_control_id = %call_control_id, "Call answered");

        let setup = self.attach_media(api.as_ref(), call_control_id).await;
        let conference_id = match &setup.conference {
            StepOutcome::Succeeded(id) => Some(id.clone()),
            _ => None,
        };

        Ok(AnswerOutcome {
            call_control_id: call_control_id.to_string(),
            media: setup.path(),
            conference_id,
        })
    }

    async fn attach_media(&self, api: &dyn TelephonyApi, call_control_id: &str) -> MediaSetup {
        let conference_name = format!("crm-{}", call_control_id);

        let conference = match api.join_conference(call_control_id, &conference_name).await {
            Ok(conference_id) => {
                self.registry
                    .set_conference(call_control_id, conference_id.clone())
                    .await;
                info!(call_control_id = %call_control_id, conference_id = %conference_id, "Call joined conference");
                StepOutcome::Succeeded(conference_id)
            }
            Err(e) => {
                warn!(call_control_id = %call_control_id, "Conference join failed: {}", e);
                StepOutcome::Failed(e)
            }
        };

        let hold_audio = match (&conference, self.settings.hold_audio_url.as_deref()) {
            (StepOutcome::Succeeded(_), _) => StepOutcome::Skipped,
            (_, None) => {
                warn!(call_control_id = %call_control_id, "No hold audio configured; caller has no media");
                StepOutcome::Skipped
            }
            (_, Some(audio_url)) => match api.play_audio(call_control_id, audio_url).await {
                Ok(()) => {
                    info!(call_control_id = %call_control_id, "Playing hold audio");
                    StepOutcome::Succeeded(())
                }
                Err(e) => {
                    error!(call_control_id = %call_control_id, "Hold audio fallback failed: {}", e);
                    StepOutcome::Failed(e)
                }
            },
        };

        MediaSetup {
            conference,
            hold_audio,
        }
    }

    /// Reject an incoming call. Rejection is terminal for the UI.
    ///
    /// The session stays in the registry as `Rejected` until the vendor's
    /// hangup arrives, which then removes it without announcing anything.
    pub async fn reject(&self, call_control_id: &str) -> Result<()> {
        let api = self.api(REJECT)?;
        let call_control_id = require(REJECT, "callControlId", call_control_id)?;

        api.reject(call_control_id)
            .await
            .map_err(|source| vendor(REJECT, source))?;

        self.registry
            .upsert(call_control_id, SessionPatch::status(SessionStatus::Rejected))
            .await;
        self.broadcaster
            .broadcast(&CallEvent::call_status(call_control_id, UiCallStatus::Rejected));
        info!(call_control_id = %call_control_id, "Call rejected");
        Ok(())
    }

    /// Poll the vendor for the live status of a call
    pub async fn call_status(&self, call_control_id: &str) -> Result<UiCallStatus> {
        let api = self.api(CALL_STATUS)?;
        let call_control_id = require(CALL_STATUS, "callControlId", call_control_id)?;

        let vendor_status = api
            .call_status(call_control_id)
            .await
            .map_err(|source| vendor(CALL_STATUS, source))?;
        let known = self
            .registry
            .get(call_control_id)
            .await
            .map(|session| session.status);

        Ok(UiCallStatus::from_vendor_state(
            vendor_status.is_alive,
            vendor_status.state.as_deref(),
            known,
        ))
    }

    pub async fn active_calls(&self) -> Vec<CallSession> {
        self.registry.list().await
    }

    pub async fn send_sms(&self, to: &str, from: Option<String>, text: &str) -> Result<SmsResponse> {
        let api = self.api(SEND_SMS)?;
        let to = require(SEND_SMS, "to", to)?;
        let text = require(SEND_SMS, "text", text)?;
        let from = self.sender(SEND_SMS, from)?;

        let response = api
            .send_sms(SmsRequest {
                to: to.to_string(),
                from,
                text: text.to_string(),
            })
            .await
            .map_err(|source| vendor(SEND_SMS, source))?;
        info!(message_id = %response.message_id, to = %to, "SMS sent");
        Ok(response)
    }

    /// Send the same text to each recipient in turn, pausing between sends
    /// to stay under the carrier's rate limit. Individual failures are
    /// counted, not raised.
    pub async fn send_bulk_sms(
        &self,
        recipients: &[String],
        from: Option<String>,
        text: &str,
    ) -> Result<BulkSmsSummary> {
        let api = self.api(SEND_BULK_SMS)?;
        if recipients.is_empty() {
            return Err(CallControlError::invalid(SEND_BULK_SMS, "recipients must not be empty"));
        }
        let recipients = recipients
            .iter()
            .map(|to| require(SEND_BULK_SMS, "recipient", to))
            .collect::<Result<Vec<_>>>()?;
        let text = require(SEND_BULK_SMS, "text", text)?;
        let from = self.sender(SEND_BULK_SMS, from)?;

        let mut summary = BulkSmsSummary {
            sent: 0,
            failed: 0,
            results: Vec::with_capacity(recipients.len()),
        };

        for (index, to) in recipients.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.bulk_sms_delay).await;
            }

            let result = api
                .send_sms(SmsRequest {
                    to: to.to_string(),
                    from: from.clone(),
                    text: text.to_string(),
                })
                .await;

            match result {
                Ok(response) => {
                    summary.sent += 1;
                    summary.results.push(BulkSmsResult {
                        to: to.to_string(),
                        success: true,
                        message_id: Some(response.message_id),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(to = %to, "Bulk SMS send failed: {}", e);
                    summary.failed += 1;
                    summary.results.push(BulkSmsResult {
                        to: to.to_string(),
                        success: false,
                        message_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(sent = summary.sent, failed = summary.failed, "Bulk SMS finished");
        Ok(summary)
    }
}

fn vendor(action: &'static str, source: TelnyxError) -> CallControlError {
    CallControlError::Vendor { action, source }
}

fn require<'a>(action: &'static str, field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(CallControlError::invalid(action, format!("{} is required", field)))
    } else {
        Ok(value)
    }
}

fn is_valid_dtmf(digits: &str) -> bool {
    !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | '#' | 'A'..='D' | 'a'..='d' | 'w' | 'W'))
}
