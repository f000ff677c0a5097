//! Shared fixtures for the HTTP integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use switchboard::application::Switchboard;
use switchboard::config::Config;
use switchboard::infrastructure::telnyx::{
    DialRequest, DialResponse, SmsRequest, SmsResponse, TelephonyApi, TelnyxError,
    VendorCallStatus, WebhookVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use switchboard::interface::api::{build_router, AppState};
use tower::ServiceExt; // For `oneshot`

/// In-memory stand-in for the Telnyx API that records what it was asked to do
#[derive(Default)]
pub struct FakeTelnyx {
    pub calls: Mutex<Vec<String>>,
    pub sms: Mutex<Vec<(String, Instant)>>,
    /// Recipients whose SMS the fake rejects
    pub failing_recipients: Vec<String>,
    pub conference_fails: bool,
}

impl FakeTelnyx {
    fn record(&self, action: String) {
        self.calls.lock().unwrap().push(action);
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelephonyApi for FakeTelnyx {
    async fn dial(&self, request: DialRequest) -> Result<DialResponse, TelnyxError> {
        self.record(format!("dial {}", request.to));
        if request.to == "+15550000000" {
            return Err(TelnyxError::Api {
                status: 422,
                message: "Invalid destination number".to_string(),
            });
        }
        Ok(DialResponse {
            call_control_id: "v3:outbound-1".to_string(),
            call_leg_id: Some("leg-1".to_string()),
            call_session_id: Some("session-1".to_string()),
        })
    }

    async fn hangup(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.record(format!("hangup {}", call_control_id));
        Ok(())
    }

    async fn send_dtmf(&self, call_control_id: &str, digits: &str) -> Result<(), TelnyxError> {
        self.record(format!("dtmf {} {}", call_control_id, digits));
        Ok(())
    }

    async fn answer(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.record(format!("answer {}", call_control_id));
        Ok(())
    }

    async fn reject(&self, call_control_id: &str) -> Result<(), TelnyxError> {
        self.record(format!("reject {}", call_control_id));
        Ok(())
    }

    async fn join_conference(&self, call_control_id: &str, name: &str) -> Result<String, TelnyxError> {
        self.record(format!("conference {} {}", call_control_id, name));
        if self.conference_fails {
            Err(TelnyxError::Transport("connection reset".to_string()))
        } else {
            Ok(format!("conf-{}", call_control_id))
        }
    }

    async fn play_audio(&self, call_control_id: &str, _audio_url: &str) -> Result<(), TelnyxError> {
        self.record(format!("play {}", call_control_id));
        Ok(())
    }

    async fn call_status(&self, call_control_id: &str) -> Result<VendorCallStatus, TelnyxError> {
        self.record(format!("status {}", call_control_id));
        Ok(VendorCallStatus {
            is_alive: true,
            state: Some("bridging".to_string()),
        })
    }

    async fn send_sms(&self, request: SmsRequest) -> Result<SmsResponse, TelnyxError> {
        self.sms.lock().unwrap().push((request.to.clone(), Instant::now()));
        if self.failing_recipients.contains(&request.to) {
            return Err(TelnyxError::Api {
                status: 400,
                message: "Invalid 'to' address".to_string(),
            });
        }
        Ok(SmsResponse {
            message_id: format!("msg-{}", request.to),
            status: Some("queued".to_string()),
        })
    }
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.telnyx.phone_number = Some("+15550009999".to_string());
    config.telnyx.hold_audio_url = Some("https://example.com/hold.mp3".to_string());
    config.telnyx.public_key = Some(BASE64.encode(signing_key().verifying_key().to_bytes()));
    config
}

pub struct TestApp {
    pub router: Router,
    pub switchboard: Switchboard,
}

pub fn setup(config: &Config, api: Option<Arc<dyn TelephonyApi>>) -> TestApp {
    let verifier = WebhookVerifier::new(
        config.telnyx.public_key.as_deref(),
        config.webhook.allow_unsigned,
        config.webhook.tolerance_secs,
    )
    .unwrap();

    let switchboard = Switchboard::start(config, api);
    let state = AppState::new(&switchboard, verifier, Duration::from_secs(15), None);

    TestApp {
        router: build_router(state),
        switchboard,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Webhook request signed the way Telnyx signs it
pub fn signed_webhook(uri: &str, body: &Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = signing_key().sign(format!("{}|{}", timestamp, body).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, BASE64.encode(signature.to_bytes()))
        .body(Body::from(body))
        .unwrap()
}

pub fn call_event(event_type: &str, payload: Value) -> Value {
    serde_json::json!({
        "data": {
            "event_type": event_type,
            "id": uuid::Uuid::new_v4().to_string(),
            "payload": payload,
        }
    })
}
