//! ドメイン層のエラー定義

use thiserror::Error;

/// Value Object の生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Repository 操作のエラー
///
/// Meeting Service が前提とするのは `MeetingNotFound` のみ。
/// `Backend` は外部キャッシュ実装の通信失敗を表す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("meeting '{0}' not found")]
    MeetingNotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
