//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::RepositoryError;

/// イベント適用のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyEventError {
    /// 参加者イベントがミーティングを作ることはない
    #[error("meeting '{0}' not found")]
    MeetingNotFound(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ApplyEventError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::MeetingNotFound(id) => Self::MeetingNotFound(id),
            other => Self::Repository(other),
        }
    }
}
