//! Webhook から復号されたミーティングイベント
//!
//! 文字列のイベント種別による動的ディスパッチは行わず、閉じた列挙型として扱う。

use super::{MeetingId, ParticipantId, Timestamp};

/// ミーティング系イベントの共通情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDetails {
    pub id: MeetingId,
    pub topic: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
}

impl MeetingDetails {
    pub fn new(id: MeetingId) -> Self {
        Self {
            id,
            topic: None,
            start_time: None,
            end_time: None,
        }
    }
}

/// 状態遷移リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingEvent {
    MeetingCreated(MeetingDetails),
    MeetingUpdated(MeetingDetails),
    MeetingStarted(MeetingDetails),
    MeetingEnded(MeetingDetails),
    ParticipantJoined {
        meeting_id: MeetingId,
        participant_id: ParticipantId,
    },
    ParticipantLeft {
        meeting_id: MeetingId,
        participant_id: ParticipantId,
    },
    /// 本システムが意図的に扱わない種別
    Unrecognized { event_type: String },
}

impl MeetingEvent {
    /// イベントが対象とするミーティング ID
    pub fn meeting_id(&self) -> Option<&MeetingId> {
        match self {
            Self::MeetingCreated(details)
            | Self::MeetingUpdated(details)
            | Self::MeetingStarted(details)
            | Self::MeetingEnded(details) => Some(&details.id),
            Self::ParticipantJoined { meeting_id, .. } | Self::ParticipantLeft { meeting_id, .. } => {
                Some(meeting_id)
            }
            Self::Unrecognized { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MeetingCreated(_) => "meeting_created",
            Self::MeetingUpdated(_) => "meeting_updated",
            Self::MeetingStarted(_) => "meeting_started",
            Self::MeetingEnded(_) => "meeting_ended",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}
