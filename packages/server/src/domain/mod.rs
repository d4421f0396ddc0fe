//! ドメイン層
//!
//! ミーティングの状態と、その状態を扱うためのインターフェース（Repository / Subscriber）を定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod entity;
pub mod error;
pub mod event;
pub mod repository;
pub mod snapshot;
pub mod subscriber;
pub mod value_object;

pub use entity::{Meeting, MeetingStatus};
pub use error::{RepositoryError, ValueObjectError};
pub use event::{MeetingDetails, MeetingEvent};
pub use repository::MeetingRepository;
#[cfg(test)]
pub use repository::MockMeetingRepository;
pub use snapshot::{DisplayStatus, MeetingStatusView, StatusSnapshot, build_status_snapshot};
pub use subscriber::MeetingSubscriber;
#[cfg(test)]
pub use subscriber::MockMeetingSubscriber;
pub use value_object::{ClientId, MeetingId, ParticipantId, Timestamp};
