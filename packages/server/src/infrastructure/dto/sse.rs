//! SSE DTOs

use serde::{Deserialize, Serialize};

/// SSE の event 名
pub const CONNECTED_EVENT: &str = "connected";
pub const UPDATE_EVENT: &str = "update";

/// keep-alive のコメント本文
pub const KEEP_ALIVE_COMMENT: &str = "ping";

/// 接続直後に送る `connected` フレームの data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedDto {
    pub client_id: String,
}
