//! Webhook endpoint handler.
//!
//! 処理順: 本文の読み込み → 署名検証 → 鮮度確認 → envelope の解釈 → URL 検証チャレンジ
//! → イベント復号 → Meeting Service への適用
//!
//! 署名検証を通った後は、復号失敗や未知のミーティングでも 200 を返す（ログのみ）。

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};

use meetboard_shared::sanitize::sanitize_for_log;

use crate::{
    infrastructure::{
        dto::{
            decoder::decode_event,
            webhook::{
                URL_VALIDATION_EVENT, UrlValidationPayload, UrlValidationResponse, WebhookAck,
                WebhookEnvelope,
            },
        },
        signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
    },
    ui::{error::WebhookError, state::AppState},
    usecase::{ApplyEventError, ApplyOutcome},
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// `POST /webhook`
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, WebhookError> {
    let body = body?;
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);

    state.verifier.verify(signature, timestamp, &body)?;
    state
        .verifier
        .check_freshness(timestamp, state.clock.now_millis() / 1000)?;

    let envelope: WebhookEnvelope =
        serde_json::from_slice(&body).map_err(WebhookError::MalformedEnvelope)?;
    let event_type = sanitize_for_log(&envelope.event);
    tracing::debug!(event_type = %event_type, event_ts = ?envelope.event_ts, "Webhook envelope accepted");

    if envelope.event == URL_VALIDATION_EVENT {
        return answer_url_validation(&state, envelope.payload).map(IntoResponse::into_response);
    }

    let event = match decode_event(&envelope.event, envelope.payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                event_type = %event_type,
                error = %sanitize_for_log(&e.to_string()),
                "Dropping webhook event that could not be decoded"
            );
            return Ok(Json(WebhookAck::ok()).into_response());
        }
    };

    let kind = event.kind();
    let target = event
        .meeting_id()
        .map(|id| sanitize_for_log(id.as_str()))
        .unwrap_or_default();

    match state.meeting_service.apply(event).await {
        Ok(ApplyOutcome::Applied(_)) => {
            tracing::info!(kind, meeting_id = %target, "Webhook event applied");
        }
        Ok(ApplyOutcome::Ignored { .. }) => {
            tracing::warn!(event_type = %event_type, "Ignoring unsupported webhook event");
        }
        Err(ApplyEventError::MeetingNotFound(meeting_id)) => {
            tracing::warn!(
                event_type = %event_type,
                meeting_id = %sanitize_for_log(&meeting_id),
                "Dropping participant event for unknown meeting"
            );
        }
        Err(ApplyEventError::Repository(e)) => {
            tracing::error!(
                event_type = %event_type,
                error = %sanitize_for_log(&e.to_string()),
                "Failed to apply webhook event"
            );
        }
    }

    Ok(Json(WebhookAck::ok()).into_response())
}

fn answer_url_validation(
    state: &AppState,
    payload: serde_json::Value,
) -> Result<Json<UrlValidationResponse>, WebhookError> {
    let challenge: UrlValidationPayload =
        serde_json::from_value(payload).map_err(WebhookError::MalformedChallenge)?;
    let encrypted_token = state
        .verifier
        .challenge_response(&challenge.plain_token)
        .map_err(|_| WebhookError::ChallengeUnavailable)?;

    tracing::info!("Answered webhook url validation challenge");
    Ok(Json(UrlValidationResponse {
        plain_token: challenge.plain_token,
        encrypted_token,
    }))
}

/// `/webhook` への POST 以外のメソッド
pub async fn reject_method(method: Method) -> StatusCode {
    tracing::warn!(method = %sanitize_for_log(method.as_str()), "Rejected webhook request with unsupported method");
    StatusCode::METHOD_NOT_ALLOWED
}
