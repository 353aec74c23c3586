//! Relay output capture.
//!
//! Lines from the relay's stdout/stderr are kept in a bounded ring buffer
//! for the dashboard and forwarded to event subscribers as they arrive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use stagehand_core::{RelayEvent, RelayLogEntry};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use super::broadcaster::RelayEventBroadcaster;

/// Maximum number of log lines to keep
const MAX_LOG_LINES: usize = 2000;

/// Ring buffer of recent relay output.
pub struct RelayLogBuffer {
    lines: Mutex<VecDeque<RelayLogEntry>>,
    events: Arc<RelayEventBroadcaster>,
}

impl RelayLogBuffer {
    pub fn new(events: Arc<RelayEventBroadcaster>) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)),
            events,
        }
    }

    /// Record a line, evicting the oldest if at capacity.
    pub fn push(&self, stream: &str, line: &str) {
        let entry = RelayLogEntry::new(line, stream);
        debug!(target: "mediamtx", stream = %stream, "{line}");

        {
            let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            if lines.len() >= MAX_LOG_LINES {
                lines.pop_front();
            }
            lines.push_back(entry.clone());
        }

        self.events.broadcast(RelayEvent::Log(entry));
    }

    pub fn entries(&self) -> Vec<RelayLogEntry> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn a task that copies lines from `reader` into `buffer` until EOF.
pub fn spawn_stream_reader<R>(reader: R, stream: &'static str, buffer: Arc<RelayLogBuffer>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            buffer.push(stream, &text);
        }
        debug!(stream = %stream, "Relay output reader exiting");
    });
}
