//! Webhook 境界のエラーと HTTP ステータスの対応

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meetboard_shared::sanitize::sanitize_for_log;
use thiserror::Error;

use crate::infrastructure::signature::SignatureError;

/// Webhook 受信時に呼び出し元へ返すエラー
///
/// 復号失敗や未知のミーティングはここに含めない（200 で受理してログのみ）。
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("request body too large")]
    PayloadTooLarge,

    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("malformed webhook envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("malformed url validation payload: {0}")]
    MalformedChallenge(#[source] serde_json::Error),

    #[error("url validation requires a webhook secret")]
    ChallengeUnavailable,
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnreadableBody(_) | Self::MalformedEnvelope(_) | Self::MalformedChallenge(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Signature(_) => StatusCode::UNAUTHORIZED,
            Self::ChallengeUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// ログ用のメッセージ（本文や payload 由来の文字列を含みうる）
    pub fn log_message(&self) -> String {
        sanitize_for_log(&self.to_string())
    }
}

impl From<BytesRejection> for WebhookError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::UnreadableBody(rejection.body_text())
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(status = status.as_u16(), error = %self.log_message(), "Rejected webhook request");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
