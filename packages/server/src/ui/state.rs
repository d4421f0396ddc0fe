//! Server state

use std::sync::Arc;

use meetboard_shared::time::Clock;

use crate::{
    infrastructure::{broadcaster::SseBroadcaster, signature::SignatureVerifier},
    usecase::MeetingService,
};

/// Shared application state
pub struct AppState {
    /// MeetingService（イベント適用と読み取りモデル）
    pub meeting_service: Arc<MeetingService>,
    /// SseBroadcaster（SSE クライアントの登録と配信）
    pub broadcaster: Arc<SseBroadcaster>,
    pub verifier: SignatureVerifier,
    pub clock: Arc<dyn Clock>,
}
