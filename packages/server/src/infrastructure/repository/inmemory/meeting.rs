//! InMemory Meeting Repository 実装
//!
//! ドメイン層が定義する MeetingRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## ロック
//!
//! Store 全体を 1 つの RwLock で保護する。各操作は O(1) の map 操作のみで、
//! ロックを保持したまま await しない。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Meeting, MeetingId, MeetingRepository, ParticipantId, RepositoryError};

/// インメモリ Meeting Repository 実装
#[derive(Default)]
pub struct InMemoryMeetingRepository {
    meetings: RwLock<HashMap<MeetingId, Meeting>>,
}

impl InMemoryMeetingRepository {
    /// 新しい InMemoryMeetingRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &MeetingId) -> RepositoryError {
    RepositoryError::MeetingNotFound(id.as_str().to_string())
}

#[async_trait]
impl MeetingRepository for InMemoryMeetingRepository {
    async fn save(&self, meeting: Meeting) -> Result<Meeting, RepositoryError> {
        let mut meetings = self.meetings.write().await;
        let stored = match meetings.get_mut(&meeting.id) {
            Some(existing) => {
                existing.merge_from(&meeting);
                existing.clone()
            }
            None => {
                let created = meeting.into_new_record();
                meetings.insert(created.id.clone(), created.clone());
                created
            }
        };
        Ok(stored)
    }

    async fn get(&self, id: &MeetingId) -> Result<Meeting, RepositoryError> {
        let meetings = self.meetings.read().await;
        meetings.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn list_active(&self) -> Result<Vec<Meeting>, RepositoryError> {
        let meetings = self.meetings.read().await;
        Ok(meetings
            .values()
            .filter(|m| !m.status.is_ended())
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Meeting>, RepositoryError> {
        let meetings = self.meetings.read().await;
        Ok(meetings.values().cloned().collect())
    }

    async fn delete(&self, id: &MeetingId) -> Result<(), RepositoryError> {
        let mut meetings = self.meetings.write().await;
        meetings.remove(id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    async fn add_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: ParticipantId,
    ) -> Result<(), RepositoryError> {
        let mut meetings = self.meetings.write().await;
        let meeting = meetings
            .get_mut(meeting_id)
            .ok_or_else(|| not_found(meeting_id))?;
        meeting.participants.insert(participant_id);
        Ok(())
    }

    async fn remove_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> Result<(), RepositoryError> {
        let mut meetings = self.meetings.write().await;
        let meeting = meetings
            .get_mut(meeting_id)
            .ok_or_else(|| not_found(meeting_id))?;
        meeting.participants.remove(participant_id);
        Ok(())
    }

    async fn count_participants(&self, meeting_id: &MeetingId) -> Result<usize, RepositoryError> {
        let meetings = self.meetings.read().await;
        meetings
            .get(meeting_id)
            .map(Meeting::participant_count)
            .ok_or_else(|| not_found(meeting_id))
    }

    async fn clear_participants(&self, meeting_id: &MeetingId) -> Result<(), RepositoryError> {
        let mut meetings = self.meetings.write().await;
        let meeting = meetings
            .get_mut(meeting_id)
            .ok_or_else(|| not_found(meeting_id))?;
        meeting.participants.clear();
        Ok(())
    }
}
