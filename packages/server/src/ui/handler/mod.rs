//! HTTP endpoint handlers.

mod events;
mod http;
mod webhook;

pub use events::stream_events;
pub use http::{health_check, list_meetings};
pub use webhook::{receive_webhook, reject_method};
