//! Data Transfer Objects (DTOs)
//!
//! DTOs are organized by protocol:
//! - `webhook`: 受信する Webhook の envelope と payload
//! - `decoder`: Webhook payload → ドメインイベントへの変換
//! - `snapshot`: SSE / HTTP で返すスナップショット
//! - `sse`: SSE のフレーム種別と接続通知

pub mod conversion;
pub mod decoder;
pub mod snapshot;
pub mod sse;
pub mod webhook;
