//! UseCase: ミーティングイベントの適用
//!
//! ## 状態遷移
//!
//! - `Created` / `Updated`: Store へ upsert。参加者には触れない
//! - `Started`: 開始時刻（未指定なら現在時刻）で保存し、**その後**参加者を空にする
//! - `Ended`: 終了時刻（未指定なら現在時刻）で保存し、参加者を空にする
//! - `ParticipantJoined` / `ParticipantLeft`: 参加者集合を更新。未知のミーティングなら何もしない
//! - `Unrecognized`: 何もしない
//!
//! `Created` / `Updated` は進んだ状態（`Started` / `Ended`）を巻き戻さない。
//! 再開は `Started` でのみ起きる。この判定は Store の `save` 内のマージで行うため、
//! 並行する Webhook の間でも保たれる。
//!
//! `Started` / `Ended` の保存後に参加者のリセットが失敗しても、保存済みの値で購読者へ通知する。
//!
//! コミット後、購読者を登録順に逐次 await する。Webhook を処理したタスク上で呼ばれるため、
//! 購読者の処理時間がそのまま Webhook の応答時間に乗る。

use std::sync::Arc;

use meetboard_shared::{sanitize::sanitize_for_log, time::Clock};

use crate::domain::{
    Meeting, MeetingDetails, MeetingEvent, MeetingId, MeetingRepository, MeetingStatus,
    MeetingSubscriber, ParticipantId, RepositoryError, StatusSnapshot, Timestamp,
    build_status_snapshot,
};

use super::error::ApplyEventError;

/// イベント適用の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// コミット後の値（購読者へ通知済み）
    Applied(Meeting),
    /// 扱わない種別のため何もしなかった
    Ignored { event_type: String },
}

/// Meeting Service
pub struct MeetingService {
    repository: Arc<dyn MeetingRepository>,
    subscribers: Vec<Arc<dyn MeetingSubscriber>>,
    clock: Arc<dyn Clock>,
}

impl MeetingService {
    pub fn new(repository: Arc<dyn MeetingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            subscribers: Vec::new(),
            clock,
        }
    }

    /// 更新通知の購読者を登録する（構築時のみ）
    pub fn register_update_callback(&mut self, subscriber: Arc<dyn MeetingSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 復号済みイベントを適用する
    ///
    /// # Errors
    ///
    /// * `ApplyEventError::MeetingNotFound` - 参加者イベントの対象ミーティングが存在しない
    /// * `ApplyEventError::Repository` - Store の通信失敗
    pub async fn apply(&self, event: MeetingEvent) -> Result<ApplyOutcome, ApplyEventError> {
        let meeting = match event {
            MeetingEvent::MeetingCreated(details) => {
                self.upsert(details, MeetingStatus::Created).await?
            }
            MeetingEvent::MeetingUpdated(details) => {
                self.upsert(details, MeetingStatus::Updated).await?
            }
            MeetingEvent::MeetingStarted(details) => self.start(details).await?,
            MeetingEvent::MeetingEnded(details) => self.end(details).await?,
            MeetingEvent::ParticipantJoined {
                meeting_id,
                participant_id,
            } => self.join(&meeting_id, participant_id).await?,
            MeetingEvent::ParticipantLeft {
                meeting_id,
                participant_id,
            } => self.leave(&meeting_id, &participant_id).await?,
            MeetingEvent::Unrecognized { event_type } => {
                tracing::debug!(
                    event_type = %sanitize_for_log(&event_type),
                    "Ignoring unrecognized event"
                );
                return Ok(ApplyOutcome::Ignored { event_type });
            }
        };

        tracing::info!(
            meeting_id = %sanitize_for_log(meeting.id.as_str()),
            status = ?meeting.status,
            participants = meeting.participant_count(),
            "Meeting state committed"
        );
        self.notify(&meeting).await;

        Ok(ApplyOutcome::Applied(meeting))
    }

    /// 表示用のスナップショット
    pub async fn status_snapshot(
        &self,
        include_ended: bool,
    ) -> Result<StatusSnapshot, RepositoryError> {
        let meetings = self.repository.list_all().await?;
        Ok(build_status_snapshot(
            &meetings,
            include_ended,
            self.now(),
        ))
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    async fn notify(&self, meeting: &Meeting) {
        for subscriber in &self.subscribers {
            subscriber.on_meeting_changed(meeting).await;
        }
    }

    async fn upsert(
        &self,
        details: MeetingDetails,
        status: MeetingStatus,
    ) -> Result<Meeting, ApplyEventError> {
        let meeting = Meeting::new(details.id, status, details.topic, details.start_time)
            .with_end_time(details.end_time);
        Ok(self.repository.save(meeting).await?)
    }

    async fn start(&self, details: MeetingDetails) -> Result<Meeting, ApplyEventError> {
        let start_time = details.start_time.unwrap_or_else(|| self.now());
        let meeting = Meeting::new(
            details.id,
            MeetingStatus::Started,
            details.topic,
            Some(start_time),
        );

        let saved = self.repository.save(meeting).await?;
        Ok(self.reset_participants(saved).await)
    }

    async fn end(&self, details: MeetingDetails) -> Result<Meeting, ApplyEventError> {
        let end_time = details.end_time.unwrap_or_else(|| self.now());
        let meeting = Meeting::new(
            details.id,
            MeetingStatus::Ended,
            details.topic,
            details.start_time,
        )
        .with_end_time(Some(end_time));

        let saved = self.repository.save(meeting).await?;
        Ok(self.reset_participants(saved).await)
    }

    /// 保存済みのミーティングの参加者を空にし、Store の最新値を返す
    ///
    /// status はコミット済みなので、ここでの失敗は警告に留めて保存済みの値を返す。
    async fn reset_participants(&self, mut saved: Meeting) -> Meeting {
        if let Err(e) = self.repository.clear_participants(&saved.id).await {
            tracing::warn!(
                meeting_id = %sanitize_for_log(saved.id.as_str()),
                error = %e,
                "Failed to reset participants"
            );
        }

        match self.repository.get(&saved.id).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(
                    meeting_id = %sanitize_for_log(saved.id.as_str()),
                    error = %e,
                    "Failed to reload meeting after reset"
                );
                saved.participants.clear();
                saved
            }
        }
    }

    async fn join(
        &self,
        meeting_id: &MeetingId,
        participant_id: ParticipantId,
    ) -> Result<Meeting, ApplyEventError> {
        self.repository
            .add_participant(meeting_id, participant_id)
            .await?;
        Ok(self.repository.get(meeting_id).await?)
    }

    async fn leave(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> Result<Meeting, ApplyEventError> {
        self.repository
            .remove_participant(meeting_id, participant_id)
            .await?;
        Ok(self.repository.get(meeting_id).await?)
    }
}
