//! Repository trait 定義
//!
//! ミーティング状態の Store が満たすべき契約。
//! インプロセス実装と外部キャッシュ実装がこの trait を共有する。
//! UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。

use async_trait::async_trait;

use super::{Meeting, MeetingId, ParticipantId, RepositoryError};

/// Meeting Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// ID で upsert する
    ///
    /// 存在しなければ参加者を空にして作成し、存在すれば `Meeting::merge_from` の規則で更新する。
    /// 既存値の読み出しとマージ後の書き戻しの間に他の `save` を挟まないこと（status の巻き戻り防止）。
    /// 保存後の値を返す。
    async fn save(&self, meeting: Meeting) -> Result<Meeting, RepositoryError>;

    async fn get(&self, id: &MeetingId) -> Result<Meeting, RepositoryError>;

    /// `Ended` 以外の全ミーティング
    async fn list_active(&self) -> Result<Vec<Meeting>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Meeting>, RepositoryError>;

    async fn delete(&self, id: &MeetingId) -> Result<(), RepositoryError>;

    async fn add_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: ParticipantId,
    ) -> Result<(), RepositoryError>;

    /// 参加していない ID の削除は何もしない
    async fn remove_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> Result<(), RepositoryError>;

    async fn count_participants(&self, meeting_id: &MeetingId) -> Result<usize, RepositoryError>;

    async fn clear_participants(&self, meeting_id: &MeetingId) -> Result<(), RepositoryError>;
}
