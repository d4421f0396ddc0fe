//! HTTP server (axum)
//!
//! - `POST /webhook`: Webhook 受信
//! - `GET /events`: SSE による更新通知
//! - `GET /api/meetings`, `GET /api/health`: 読み取り専用 API

pub mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use error::WebhookError;
pub use server::{MAX_WEBHOOK_BODY_BYTES, Server, build_router};
pub use signal::shutdown_signal;
pub use state::AppState;
