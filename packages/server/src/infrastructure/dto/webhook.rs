//! Webhook DTOs

use serde::{Deserialize, Serialize};

/// URL 検証チャレンジのイベント種別（デコーダを通さない）
pub const URL_VALIDATION_EVENT: &str = "endpoint.url_validation";

pub const MEETING_CREATED: &str = "meeting.created";
pub const MEETING_UPDATED: &str = "meeting.updated";
pub const MEETING_STARTED: &str = "meeting.started";
pub const MEETING_ENDED: &str = "meeting.ended";
pub const PARTICIPANT_JOINED: &str = "meeting.participant_joined";
pub const PARTICIPANT_LEFT: &str = "meeting.participant_left";

/// 共通 envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub event_ts: Option<i64>,
    pub payload: serde_json::Value,
}

/// 数値・文字列のどちらでも来る ID
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlexibleId {
    Text(String),
    Number(u64),
}

impl FlexibleId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// meeting.created / updated / started / ended の payload
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingPayload {
    pub object: MeetingObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingObject {
    pub id: FlexibleId,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// meeting.participant_joined / left の payload
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantPayload {
    pub object: ParticipantMeetingObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantMeetingObject {
    pub id: FlexibleId,
    pub participant: ParticipantObject,
}

/// 参加者情報（保存されるのは導出した ID のみ）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantObject {
    #[serde(default)]
    pub participant_uuid: Option<String>,
    #[serde(default)]
    pub id: Option<FlexibleId>,
    #[serde(default)]
    pub user_id: Option<FlexibleId>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// endpoint.url_validation の payload
#[derive(Debug, Clone, Deserialize)]
pub struct UrlValidationPayload {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
}

/// URL 検証チャレンジへの応答
#[derive(Debug, Clone, Serialize)]
pub struct UrlValidationResponse {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
    #[serde(rename = "encryptedToken")]
    pub encrypted_token: String,
}

/// 受理応答
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
