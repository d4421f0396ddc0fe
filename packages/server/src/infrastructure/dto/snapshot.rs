//! スナップショット DTOs（SSE の `update` フレームと `GET /api/meetings` で共通）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingStatusDto {
    pub id: String,
    pub topic: Option<String>,
    /// `scheduled` / `in_progress` / `ended`
    pub status: String,
    pub participant_count: usize,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDto {
    pub meetings: Vec<MeetingStatusDto>,
    pub generated_at: Option<String>,
}
