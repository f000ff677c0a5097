//! Call and SMS action handlers

use super::dto::{
    Ack, AnswerResponse, ApiResponse, BulkSmsRequest, BulkSmsResponse, CallStatusResponse,
    DtmfRequest, HangupRequest, PlaceCallRequest, PlaceCallResponse, SendSmsRequest,
    SendSmsResponse,
};
use super::error::ApiResult;
use super::state::AppState;
use crate::domain::call::CallSession;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

/// Active calls list response
#[derive(Debug, Serialize)]
pub struct ActiveCallsResponse {
    pub calls: Vec<CallSession>,
    pub total: usize,
}

/// Place an outbound call
pub async fn place_call(
    State(state): State<AppState>,
    payload: Result<Json<PlaceCallRequest>, JsonRejection>,
) -> ApiResult<Json<PlaceCallResponse>> {
    let Json(req) = payload?;
    info!("API: Placing call to {}", req.to);

    let dial = state.calls.place_call(&req.to, req.from, req.webhook_url).await?;
    Ok(Json(dial.into()))
}

pub async fn hangup_call(
    State(state): State<AppState>,
    payload: Result<Json<HangupRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(req) = payload?;
    info!("API: Hanging up call {}", req.call_control_id);

    state.calls.hangup(&req.call_control_id).await?;
    Ok(Json(Ack::ok()))
}

pub async fn send_dtmf(
    State(state): State<AppState>,
    payload: Result<Json<DtmfRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(req) = payload?;

    state.calls.send_dtmf(&req.call_control_id, &req.digits).await?;
    Ok(Json(Ack::ok()))
}

/// Answer an incoming call and bridge its media
pub async fn answer_call(
    State(state): State<AppState>,
    Path(call_control_id): Path<String>,
) -> ApiResult<Json<AnswerResponse>> {
    info!("API: Answering call {}", call_control_id);

    let outcome = state.calls.answer(&call_control_id).await?;
    Ok(Json(AnswerResponse {
        success: true,
        outcome,
    }))
}

pub async fn reject_call(
    State(state): State<AppState>,
    Path(call_control_id): Path<String>,
) -> ApiResult<Json<Ack>> {
    info!("API: Rejecting call {}", call_control_id);

    state.calls.reject(&call_control_id).await?;
    Ok(Json(Ack::ok()))
}

/// Poll the carrier for a call's live status
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_control_id): Path<String>,
) -> ApiResult<Json<CallStatusResponse>> {
    let status = state.calls.call_status(&call_control_id).await?;
    Ok(Json(CallStatusResponse {
        success: true,
        call_control_id,
        status,
    }))
}

/// Get active calls
pub async fn get_active_calls(
    State(state): State<AppState>,
) -> Json<ApiResponse<ActiveCallsResponse>> {
    let calls = state.calls.active_calls().await;
    let total = calls.len();
    Json(ApiResponse::success(ActiveCallsResponse { calls, total }))
}

pub async fn send_sms(
    State(state): State<AppState>,
    payload: Result<Json<SendSmsRequest>, JsonRejection>,
) -> ApiResult<Json<SendSmsResponse>> {
    let Json(req) = payload?;
    info!("API: Sending SMS to {}", req.to);

    let sms = state.calls.send_sms(&req.to, req.from, &req.text).await?;
    Ok(Json(sms.into()))
}

/// Send one text to many recipients, paced by `sms.bulk_delay_ms`
pub async fn send_bulk_sms(
    State(state): State<AppState>,
    payload: Result<Json<BulkSmsRequest>, JsonRejection>,
) -> ApiResult<Json<BulkSmsResponse>> {
    let Json(req) = payload?;
    info!("API: Sending bulk SMS to {} recipients", req.recipients.len());

    let summary = state
        .calls
        .send_bulk_sms(&req.recipients, req.from, &req.text)
        .await?;
    Ok(Json(BulkSmsResponse {
        success: true,
        summary,
    }))
}
