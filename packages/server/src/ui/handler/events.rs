//! SSE endpoint handler.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
};
use futures_util::Stream;

use crate::ui::state::AppState;

/// `GET /events`
///
/// keep-alive はサブスクリプション側の ticker が送るので `Sse::keep_alive` は使わない。
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let subscription = state.broadcaster.subscribe().map_err(|e| {
        tracing::warn!(error = %e, "Rejected SSE connection");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    tracing::info!(
        client_id = %subscription.id(),
        clients = state.broadcaster.client_count(),
        "SSE client connected"
    );

    Ok(Sse::new(subscription.into_event_stream()))
}
