//! Telnyx REST adapter
//!
//! Each operation is a single request with no retries; failures are
//! surfaced to the caller as they come.

use super::api::{
    DialRequest, DialResponse, SmsRequest, SmsResponse, TelephonyApi, VendorCallStatus,
};
use super::error::{extract_error_message, TelnyxError};
use crate::config::TelnyxConfig;
use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Telnyx wraps every resource in `{"data": ...}`
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ConferenceRecord {
    id: String,
}

#[derive(Clone)]
pub struct TelnyxClient {
    http: Client,
    api_base: Url,
    api_key: String,
    connection_id: Option<String>,
}

impl TelnyxClient {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        connection_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TelnyxError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelnyxError::Transport(format!("failed to build HTTP client: {e}")))?;

        let api_base = Url::parse(api_base)
            .map_err(|e| TelnyxError::Transport(format!("invalid API base URL {api_base:?}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(TelnyxError::Transport(format!(
                "invalid API base URL {:?}: not a base URL",
                api_base.as_str()
            )));
        }

        Ok(Self {
            http,
            api_base,
            api_key: api_key.into(),
            connection_id,
        })
    }

    /// Build a client from configuration. `Ok(None)` when no API key is set.
    pub fn from_config(config: &TelnyxConfig) -> Result<Option<Self>, TelnyxError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        Self::new(
            &config.api_base,
            api_key,
            config.connection_id.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .map(Some)
    }

    /// Endpoint under the API base. Each segment is percent-encoded on its
    /// own, so a `/` or `?` inside an id cannot reach another endpoint.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // `new` only accepts base URLs, which always have path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn call_action_url(&self, call_control_id: &str, action: &str) -> Url {
        self.url(&["calls", call_control_id, "actions", action])
    }

    /// Send a request and decode the `data` member of the response
    async fn send<T: DeserializeOwned>(&self, action: &'static str, request: RequestBuilder) -> Result<T, TelnyxError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .inspect_err(|_| {
                counter!("switchboard_vendor_requests_total", "action" => action, "outcome" => "transport_error")
                    .increment(1);
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            counter!("switchboard_vendor_requests_total", "action" => action, "outcome" => "error").increment(1);
            let message = extract_error_message(&body);
            warn!(action, status = status.as_u16(), "Telnyx request failed: {}", message);
            return Err(TelnyxError::Api {
                status: status.as_u16(),
                message,
            });
        }

        counter!("switchboard_vendor_requests_total", "action" => action, "outcome" => "ok").increment(1);
        debug!(action, status = status.as_u16(), "Telnyx request succeeded");

        serde_json::from_str::<DataEnvelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| TelnyxError::Decode(format!("{action}: {e}")))
    }

    /// Issue a call-control command; the response body is not needed
    async fn command(&self, action: &'static str, call_control_id: &str, mut body: Value) -> Result<(), TelnyxError> {
        check_call_control_id(call_control_id)?;

        // Lets Telnyx drop a command it has already executed.
        if let Some(object) = body.as_object_mut() {
            object.insert("command_id".to_string(), json!(Uuid::new_v4().to_string()));
        }

        let request = self
            .http
            .post(self.call_action_url(call_control_id, action))
            .json(&body);
        self.send::<Value>(action, request).await.map(|_| ())
    }
}

#[async_trait]
impl TelephonyApi for TelnyxClient {
    async fn dial(&self, request: DialRequest) -> Result<DialResponse, TelnyxError> {
        let connection_id = self
            .connection_id
            .as_deref()
            .ok_or(TelnyxError::MissingSetting("connection id"))?;

        let mut body = json!({
            "connection_id": connection_id,
            "to": request.to,
            "from": request.from,
        });
        if let Some(webhook_url) = request.webhook_url {
            body["webhook_url"] = json!(webhook_url);
        }

        let http_request = self.http.post(self.url(&["calls"])).json(&body);
        self.send("dial", http_request).await
    }

    async fn hangup(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.command("hangup", call_control_id, json!({})).await
    }

    async fn send_dtmf(&self, call_control_id: &str, digits: &str) -> Result<(), TelnyxError> {
        self.command("send_dtmf", call_control_id, json!({ "digits": digits }))
            .await
    }

    async fn answer(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.command("answer", call_control_id, json!({})).await
    }

    async fn reject(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.command("reject", call_control_id, json!({ "cause": "CALL_REJECTED" }))
            .await
    }

    async fn join_conference(&self, call_control_id: &str, name: &str) -> Result<String, TelnyxError> {
        let body = json!({
            "call_control_id": call_control_id,
            "name": name,
            "beep_enabled": "never",
        });
        let request = self.http.post(self.url(&["conferences"])).json(&body);
        let conference: ConferenceRecord = self.send("join_conference", request).await?;
        Ok(conference.id)
    }

    async fn play_audio(&self, call_control_id: &str, audio_url: &str) -> Result<(), TelnyxError> {
        self.command(
            "playback_start",
            call_control_id,
            json!({ "audio_url": audio_url, "loop": "infinity" }),
        )
        .await
    }

    async fn call_status(&self, call_control_id: &str) -> Result<VendorCallStatus, TelnyxError> {
        check_call_control_id(call_control_id)?;
        let request = self.http.get(self.url(&["calls", call_control_id]));
        self.send("call_status", request).await
    }

    async fn send_sms(&self, request: SmsRequest) -> Result<SmsResponse, TelnyxError> {
        let body = json!({
            "to": request.to,
            "from": request.from,
            "text": request.text,
        });
        let http_request = self.http.post(self.url(&["messages"])).json(&body);
        self.send("send_sms", http_request).await
    }
}

/// `.` and `..` would be resolved away as path segments
fn check_call_control_id(call_control_id: &str) -> Result<(), TelnyxError> {
    let reason = match call_control_id.trim() {
        "" => "call control id is required",
        "." | ".." => "call control id is invalid",
        _ => return Ok(()),
    };
    Err(TelnyxError::Api {
        status: 400,
        message: reason.to_string(),
    })
}
