//! 更新通知の購読者

use async_trait::async_trait;

use super::Meeting;

/// Store へのコミット後に呼び出される購読者
///
/// Meeting Service は Webhook を処理したタスク上で、登録順に逐次 await する。
/// 実装側で長時間ブロックすると Webhook への応答が遅れる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeetingSubscriber: Send + Sync {
    async fn on_meeting_changed(&self, meeting: &Meeting);
}
