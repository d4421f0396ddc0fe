//! MeetingRepository の実装
//!
//! - `inmemory`: プロセス内の HashMap
//! - `cache`: 外部キャッシュ（Redis）

pub mod cache;
pub mod inmemory;

pub use cache::RedisMeetingRepository;
pub use inmemory::InMemoryMeetingRepository;
