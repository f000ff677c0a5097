//! HTTP error mapping

use super::dto::ApiResponse;
use crate::application::CallControlError;
use crate::infrastructure::telnyx::TelnyxError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum ApiError {
    CallControl(CallControlError),
    BadRequest(String),
    Unauthorized(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::CallControl(CallControlError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
            ApiError::CallControl(CallControlError::Vendor { source, .. }) => vendor_status(source),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::CallControl(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
        }
    }
}

fn vendor_status(error: &TelnyxError) -> StatusCode {
    match error {
        TelnyxError::NotConfigured | TelnyxError::MissingSetting(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        TelnyxError::Api { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        TelnyxError::Transport(_) | TelnyxError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            warn!(status = status.as_u16(), "API request failed: {}", message);
        } else {
            debug!(status = status.as_u16(), "API request rejected: {}", message);
        }

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<CallControlError> for ApiError {
    fn from(err: CallControlError) -> Self {
        ApiError::CallControl(err)
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
