//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{infrastructure::dto::snapshot::SnapshotDto, ui::state::AppState};

#[derive(Debug, Deserialize)]
pub struct MeetingsQuery {
    #[serde(default = "default_include_ended")]
    include_ended: bool,
}

fn default_include_ended() -> bool {
    true
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get the current status snapshot
pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MeetingsQuery>,
) -> Result<Json<SnapshotDto>, StatusCode> {
    match state
        .meeting_service
        .status_snapshot(query.include_ended)
        .await
    {
        Ok(snapshot) => Ok(Json(SnapshotDto::from(snapshot))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build status snapshot");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
