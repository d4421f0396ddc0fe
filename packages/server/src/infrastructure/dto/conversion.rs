//! Conversion logic between DTOs and domain models.

use meetboard_shared::time::timestamp_to_rfc3339;

use crate::domain::{ClientId, MeetingStatusView, StatusSnapshot, Timestamp};

use super::{
    snapshot::{MeetingStatusDto, SnapshotDto},
    sse::ConnectedDto,
};

fn format_time(timestamp: Option<Timestamp>) -> Option<String> {
    timestamp.and_then(|t| timestamp_to_rfc3339(t.value()))
}

// ========================================
// Domain → DTO
// ========================================

impl From<MeetingStatusView> for MeetingStatusDto {
    fn from(view: MeetingStatusView) -> Self {
        Self {
            id: view.id.into_string(),
            topic: view.topic,
            status: view.status.as_str().to_string(),
            participant_count: view.participant_count,
            start_time: format_time(view.start_time),
            end_time: format_time(view.end_time),
        }
    }
}

impl From<StatusSnapshot> for SnapshotDto {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            meetings: snapshot.meetings.into_iter().map(Into::into).collect(),
            generated_at: format_time(Some(snapshot.generated_at)),
        }
    }
}

impl From<&ClientId> for ConnectedDto {
    fn from(client_id: &ClientId) -> Self {
        Self {
            client_id: client_id.as_str().to_string(),
        }
    }
}
