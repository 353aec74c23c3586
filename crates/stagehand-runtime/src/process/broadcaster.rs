//! Relay event broadcasting for SSE clients.

use stagehand_core::RelayEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel capacity for relay events
const CHANNEL_CAPACITY: usize = 256;

/// Broadcaster for relay lifecycle and log events.
///
/// Owned by a single supervisor; there is no process-wide instance.
pub struct RelayEventBroadcaster {
    sender: broadcast::Sender<RelayEvent>,
}

impl RelayEventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast(&self, event: RelayEvent) {
        // Only send if there are receivers (avoid spam when no SSE clients)
        if self.sender.receiver_count() > 0 {
            if !matches!(event, RelayEvent::Log(_)) {
                debug!(?event, "Broadcasting relay event");
            }
            let _ = self.sender.send(event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RelayEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let broadcaster = RelayEventBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.broadcast(RelayEvent::starting());
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, RelayEvent::Starting { .. }));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let broadcaster = RelayEventBroadcaster::new();
        broadcaster.broadcast(RelayEvent::stopped());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
