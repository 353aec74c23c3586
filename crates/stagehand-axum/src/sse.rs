//! SSE streaming of relay events.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use stagehand_core::RelayEvent;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Interval between keep-alive comments on idle streams.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Serialize one event as an SSE frame named after its `type`.
fn to_sse_event(event: &RelayEvent) -> Option<Event> {
    let json = match serde_json::to_value(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize relay event: {}", e);
            return None;
        }
    };
    let name = json
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("message")
        .to_string();
    Some(Event::default().event(name).data(json.to_string()))
}

/// Turn a relay event subscription into an SSE response.
///
/// Lagging clients skip the events they missed; the stream itself keeps
/// going.
pub fn relay_event_stream(
    receiver: broadcast::Receiver<RelayEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let stream = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(event) => to_sse_event(&event).map(Ok),
        Err(e) => {
            tracing::debug!("SSE stream error: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping"))
}
