//! 表示用の読み取りモデル

use super::{Meeting, MeetingId, MeetingStatus, Timestamp};

/// ダッシュボード表示用のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Scheduled,
    InProgress,
    Ended,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        }
    }
}

impl From<MeetingStatus> for DisplayStatus {
    fn from(status: MeetingStatus) -> Self {
        match status {
            MeetingStatus::Created | MeetingStatus::Updated => Self::Scheduled,
            MeetingStatus::Started => Self::InProgress,
            MeetingStatus::Ended => Self::Ended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingStatusView {
    pub id: MeetingId,
    pub topic: Option<String>,
    pub status: DisplayStatus,
    pub participant_count: usize,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
}

impl From<&Meeting> for MeetingStatusView {
    fn from(meeting: &Meeting) -> Self {
        let status = DisplayStatus::from(meeting.status);
        // 終了済みは保存された集合の大きさに関係なく 0 人
        let participant_count = match status {
            DisplayStatus::Ended => 0,
            _ => meeting.participant_count(),
        };
        Self {
            id: meeting.id.clone(),
            topic: meeting.topic.clone(),
            status,
            participant_count,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub meetings: Vec<MeetingStatusView>,
    pub generated_at: Timestamp,
}

/// ミーティング一覧からスナップショットを構築する（ID 順）
pub fn build_status_snapshot(
    meetings: &[Meeting],
    include_ended: bool,
    generated_at: Timestamp,
) -> StatusSnapshot {
    let mut views: Vec<MeetingStatusView> = meetings
        .iter()
        .filter(|m| include_ended || !m.status.is_ended())
        .map(MeetingStatusView::from)
        .collect();
    views.sort_by(|a, b| a.id.cmp(&b.id));

    StatusSnapshot {
        meetings: views,
        generated_at,
    }
}
