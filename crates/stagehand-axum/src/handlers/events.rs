//! SSE events handler - relay lifecycle and log streaming.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::stream::Stream;

use crate::sse::relay_event_stream;
use crate::state::AppState;

/// SSE events stream endpoint.
///
/// Clients receive every lifecycle transition (`starting`, `running`,
/// `stopping`, `stopped`, `failed`) and each captured relay output line.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    relay_event_stream(state.supervisor.subscribe_events())
}
