//! 更新通知の配信（Broadcast Manager）の実装
//!
//! - `sse`: Server-Sent Events を使った実装

pub mod sse;

pub use sse::{
    BroadcastError, BroadcastReport, BroadcasterConfig, ClientSubscription, OutboundFrame,
    SseBroadcaster,
};
