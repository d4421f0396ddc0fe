//! UseCase 層
//!
//! Webhook から復号したイベントを Store に適用し、コミット後に購読者へ通知する。

pub mod error;
pub mod meeting_service;

pub use error::ApplyEventError;
pub use meeting_service::{ApplyOutcome, MeetingService};
