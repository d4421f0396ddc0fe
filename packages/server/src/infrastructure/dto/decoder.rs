//! Webhook payload → `MeetingEvent` の変換
//!
//! Store には触れない純粋な変換。既知の種別で payload が解釈できない場合は
//! `DecodeError`、未知の種別は `MeetingEvent::Unrecognized` を返す。

use sha2::{Digest, Sha256};
use thiserror::Error;

use meetboard_shared::time::parse_rfc3339_millis;

use crate::domain::{MeetingDetails, MeetingEvent, MeetingId, ParticipantId, Timestamp};

use super::webhook::{
    MEETING_CREATED, MEETING_ENDED, MEETING_STARTED, MEETING_UPDATED, MeetingPayload,
    PARTICIPANT_JOINED, PARTICIPANT_LEFT, ParticipantObject, ParticipantPayload,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid payload for '{event_type}': {source}")]
    InvalidPayload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing or empty field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not an RFC 3339 timestamp")]
    InvalidTimestamp { field: &'static str },
}

/// イベント種別と payload を型付きイベントに変換する
pub fn decode_event(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<MeetingEvent, DecodeError> {
    let event = match event_type {
        MEETING_CREATED => MeetingEvent::MeetingCreated(decode_meeting(event_type, payload)?),
        MEETING_UPDATED => MeetingEvent::MeetingUpdated(decode_meeting(event_type, payload)?),
        MEETING_STARTED => MeetingEvent::MeetingStarted(decode_meeting(event_type, payload)?),
        MEETING_ENDED => MeetingEvent::MeetingEnded(decode_meeting(event_type, payload)?),
        PARTICIPANT_JOINED => {
            let (meeting_id, participant_id) = decode_participant(event_type, payload)?;
            MeetingEvent::ParticipantJoined {
                meeting_id,
                participant_id,
            }
        }
        PARTICIPANT_LEFT => {
            let (meeting_id, participant_id) = decode_participant(event_type, payload)?;
            MeetingEvent::ParticipantLeft {
                meeting_id,
                participant_id,
            }
        }
        other => MeetingEvent::Unrecognized {
            event_type: other.to_string(),
        },
    };
    Ok(event)
}

fn decode_meeting(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<MeetingDetails, DecodeError> {
    let payload: MeetingPayload =
        serde_json::from_value(payload).map_err(|source| DecodeError::InvalidPayload {
            event_type: event_type.to_string(),
            source,
        })?;
    let object = payload.object;

    let id = MeetingId::new(object.id.into_string())
        .map_err(|_| DecodeError::MissingField("object.id"))?;

    Ok(MeetingDetails {
        id,
        topic: object.topic.filter(|t| !t.trim().is_empty()),
        start_time: parse_time(object.start_time.as_deref(), "object.start_time")?,
        end_time: parse_time(object.end_time.as_deref(), "object.end_time")?,
    })
}

fn decode_participant(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(MeetingId, ParticipantId), DecodeError> {
    let payload: ParticipantPayload =
        serde_json::from_value(payload).map_err(|source| DecodeError::InvalidPayload {
            event_type: event_type.to_string(),
            source,
        })?;
    let object = payload.object;

    let meeting_id = MeetingId::new(object.id.into_string())
        .map_err(|_| DecodeError::MissingField("object.id"))?;
    let participant_id = derive_participant_id(object.participant)?;

    Ok((meeting_id, participant_id))
}

/// 参加者 ID を導出する
///
/// `participant_uuid` → `id` → `user_id` の順に採用し、どれも無ければ
/// メールアドレス（なければ表示名）の SHA-256 を使う。個人情報そのものは保存しない。
pub fn derive_participant_id(
    participant: ParticipantObject,
) -> Result<ParticipantId, DecodeError> {
    let explicit = participant
        .participant_uuid
        .into_iter()
        .chain(participant.id.map(|id| id.into_string()))
        .chain(participant.user_id.map(|id| id.into_string()))
        .find(|candidate| !candidate.trim().is_empty());

    if let Some(id) = explicit {
        return ParticipantId::new(id).map_err(|_| DecodeError::MissingField("participant.id"));
    }

    let personal = participant
        .email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .or_else(|| {
            participant
                .user_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .ok_or(DecodeError::MissingField("participant.id"))?;

    let digest = Sha256::digest(personal.as_bytes());
    ParticipantId::new(format!("anon-{}", hex::encode(digest)))
        .map_err(|_| DecodeError::MissingField("participant.id"))
}

fn parse_time(value: Option<&str>, field: &'static str) -> Result<Option<Timestamp>, DecodeError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_rfc3339_millis(raw)
            .map(|millis| Some(Timestamp::new(millis)))
            .ok_or(DecodeError::InvalidTimestamp { field }),
    }
}
