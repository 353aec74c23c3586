//! Per-slot playback session.
//!
//! A session owns at most one transport at a time. Every connect attempt
//! gets a new generation number; transports report link changes tagged
//! with theirs, and anything from an older generation is dropped. A new
//! attempt cancels the one in flight and waits for it to tear down what it
//! built before starting its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use stagehand_core::{ConnectionState, PlaybackMode, PlaybackSnapshot, TransportKind};
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::NegotiatorConfig;
use crate::error::{RetryError, TransportError};
use crate::hls::HlsStrategy;
use crate::rtc::WebRtcStrategy;
use crate::sink::MediaSink;
use crate::transport::{
    ActiveTransport, LinkEvent, LinkState, OpenRequest, PlaybackStrategy, TransportEvents,
};

/// Shown once the retry budget is used up.
pub const RETRY_LIMIT_MESSAGE: &str = "Maximum reconnection attempts reached";

struct Control {
    stream_active: bool,
    generation: u64,
    attempt: CancellationToken,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl Control {
    /// Invalidate whatever is in flight and return the new generation.
    fn supersede(&mut self) -> (u64, CancellationToken) {
        self.generation += 1;
        self.attempt.cancel();
        self.attempt = CancellationToken::new();
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        (self.generation, self.attempt.clone())
    }
}

struct Shared {
    slot: String,
    request: OpenRequest,
    config: NegotiatorConfig,
    strategies: Vec<Arc<dyn PlaybackStrategy>>,
    sink: Arc<dyn MediaSink>,
    control: Mutex<Control>,
    transport: AsyncMutex<Option<Box<dyn ActiveTransport>>>,
    snapshot: watch::Sender<PlaybackSnapshot>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    /// Apply `update` unless a newer attempt has taken over.
    fn publish_if_current(&self, generation: u64, update: impl FnOnce(&mut PlaybackSnapshot)) -> bool {
        let control = self.control();
        if control.generation != generation {
            return false;
        }
        self.snapshot.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        });
        drop(control);
        true
    }

    fn publish(&self, update: impl FnOnce(&mut PlaybackSnapshot)) {
        self.snapshot.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        });
    }

    /// Close the held transport and detach the sink.
    async fn teardown(&self, transport: &mut Option<Box<dyn ActiveTransport>>) {
        if let Some(mut active) = transport.take() {
            debug!(session = %self.slot, kind = ?active.kind(), "Closing transport");
            active.close().await;
        }
        self.sink.detach();
    }

    async fn connect(self: &Arc<Self>) -> ConnectionState {
        let attempt = {
            let mut control = self.control();
            control
                .stream_active
                .then(|| control.supersede())
        };

        let Some((generation, cancel)) = attempt else {
            debug!(session = %self.slot, "Stream not active, staying disconnected");
            self.publish(|s| {
                s.state = ConnectionState::Disconnected;
                s.transport = TransportKind::None;
            });
            return ConnectionState::Disconnected;
        };

        // Wait for any superseded attempt to release its transport
        let mut transport = self.transport.lock().await;
        self.teardown(&mut transport).await;

        if !self.publish_if_current(generation, |s| {
            s.state = ConnectionState::Connecting;
            s.transport = TransportKind::None;
            s.error = None;
        }) {
            return self.state();
        }
        info!(session = %self.slot, generation, mode = ?self.request.mode, "Connecting to stream");

        let mut last_error: Option<TransportError> = None;
        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                return self.state();
            }

            let kind = strategy.kind();
            debug!(session = %self.slot, transport = ?kind, "Trying transport");
            let events = TransportEvents::new(generation, cancel.clone(), self.link_tx.clone());

            match strategy.open(&self.request, events).await {
                Ok(mut opened) => {
                    let connected = self.publish_if_current(generation, |s| {
                        s.state = ConnectionState::Connected;
                        s.transport = kind;
                        s.error = None;
                        s.reconnect_attempts = 0;
                        s.retry_available = true;
                    });
                    if !connected {
                        debug!(session = %self.slot, generation, "Attempt superseded after opening");
                        opened.close().await;
                        self.sink.detach();
                        return self.state();
                    }
                    *transport = Some(opened);
                    info!(session = %self.slot, transport = ?kind, "Connected");
                    return ConnectionState::Connected;
                }
                Err(TransportError::Superseded) => {
                    debug!(session = %self.slot, generation, "Attempt superseded");
                    return self.state();
                }
                Err(e) => {
                    warn!(session = %self.slot, transport = ?kind, error = %e, "Transport failed");
                    last_error = Some(e);
                }
            }
        }

        self.sink.detach();
        let reason = last_error.map_or_else(
            || "no playback transports configured".to_string(),
            |e| e.to_string(),
        );
        self.publish_if_current(generation, |s| {
            mark_error(s, format!("Unable to connect to stream: {reason}"));
        });
        self.state()
    }

    async fn retry(self: &Arc<Self>) -> Result<ConnectionState, RetryError> {
        {
            let control = self.control();
            let snapshot = self.snapshot.borrow().clone();

            let retryable = matches!(
                snapshot.state,
                ConnectionState::Error | ConnectionState::Disconnected
            );
            if !retryable || !control.stream_active {
                return Err(RetryError::NotRetryable(snapshot.state));
            }

            if snapshot.reconnect_attempts >= snapshot.max_reconnect_attempts {
                self.publish(|s| {
                    s.retry_available = false;
                    s.error = Some(RETRY_LIMIT_MESSAGE.to_string());
                });
                info!(session = %self.slot, "Reconnect limit reached");
                return Err(RetryError::LimitReached {
                    max: snapshot.max_reconnect_attempts,
                });
            }

            // Still under the lock: a concurrent retry sees `Connecting`
            self.publish(|s| {
                s.reconnect_attempts += 1;
                s.state = ConnectionState::Connecting;
            });
            drop(control);
        }

        debug!(
            session = %self.slot,
            attempt = self.snapshot.borrow().reconnect_attempts,
            "Retrying connection"
        );
        Ok(self.connect().await)
    }

    async fn cleanup(&self) {
        self.control().supersede();
        let mut transport = self.transport.lock().await;
        self.teardown(&mut transport).await;
        self.publish(|s| {
            if s.state != ConnectionState::Error {
                s.state = ConnectionState::Disconnected;
            }
            s.transport = TransportKind::None;
        });
    }

    async fn on_link_event(self: &Arc<Self>, event: LinkEvent) {
        let (reason, fatal) = match event.state {
            LinkState::Connected => {
                trace!(session = %self.slot, generation = event.generation, "Link up");
                return;
            }
            LinkState::Lost(reason) => (reason, false),
            LinkState::Failed(reason) => (reason, true),
        };

        let generation = {
            let mut control = self.control();
            if control.generation != event.generation || self.state() != ConnectionState::Connected {
                trace!(session = %self.slot, generation = event.generation, "Ignoring stale link event");
                return;
            }
            control.supersede().0
        };

        let mut transport = self.transport.lock().await;
        self.teardown(&mut transport).await;
        drop(transport);

        if fatal {
            warn!(session = %self.slot, %reason, "Playback failed");
            self.publish_if_current(generation, |s| {
                mark_error(s, format!("Playback failed: {reason}"));
            });
            return;
        }

        info!(session = %self.slot, %reason, "Stream connection lost");
        let published = self.publish_if_current(generation, |s| {
            s.state = ConnectionState::Disconnected;
            s.transport = TransportKind::None;
            s.error = Some(format!("Stream connection lost: {reason}"));
        });
        if published {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let Some(delay) = self.config.auto_reconnect_delay else {
            return;
        };

        let weak = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Detach our own handle so the retry does not abort this task
            drop(shared.control().reconnect_timer.take());
            match shared.retry().await {
                Ok(state) => debug!(session = %shared.slot, %state, "Automatic reconnect finished"),
                Err(e) => info!(session = %shared.slot, error = %e, "Automatic reconnect skipped"),
            }
        });

        let mut control = self.control();
        if let Some(previous) = control.reconnect_timer.replace(timer) {
            previous.abort();
        }
    }
}

/// Move to `error`, disabling retry once the budget is spent.
fn mark_error(snapshot: &mut PlaybackSnapshot, message: String) {
    snapshot.state = ConnectionState::Error;
    snapshot.transport = TransportKind::None;
    if snapshot.reconnect_attempts >= snapshot.max_reconnect_attempts {
        snapshot.retry_available = false;
        snapshot.error = Some(RETRY_LIMIT_MESSAGE.to_string());
    } else {
        snapshot.error = Some(message);
    }
}

async fn drive_link_events(shared: Weak<Shared>, mut rx: mpsc::UnboundedReceiver<LinkEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.on_link_event(event).await;
    }
}

/// Playback negotiator for one preview slot.
pub struct PlaybackSession {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl PlaybackSession {
    /// Create a session that tries `strategies` in order.
    ///
    /// The session starts disconnected with the stream marked inactive.
    pub fn new(
        slot: impl Into<String>,
        request: OpenRequest,
        strategies: Vec<Arc<dyn PlaybackStrategy>>,
        sink: Arc<dyn MediaSink>,
        config: NegotiatorConfig,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(PlaybackSnapshot::new(
            request.mode,
            config.max_reconnect_attempts,
        ));

        let shared = Arc::new(Shared {
            slot: slot.into(),
            request,
            config,
            strategies,
            sink,
            control: Mutex::new(Control {
                stream_active: false,
                generation: 0,
                attempt: CancellationToken::new(),
                reconnect_timer: None,
            }),
            transport: AsyncMutex::new(None),
            snapshot,
            link_tx,
        });

        let driver = tokio::spawn(drive_link_events(Arc::downgrade(&shared), link_rx));
        Self { shared, driver }
    }

    /// Create a session with WebRTC first and HLS as fallback.
    pub fn with_default_strategies(
        slot: impl Into<String>,
        request: OpenRequest,
        sink: Arc<dyn MediaSink>,
        config: NegotiatorConfig,
    ) -> Result<Self, TransportError> {
        let strategies: Vec<Arc<dyn PlaybackStrategy>> = vec![
            Arc::new(WebRtcStrategy::new(sink.clone(), &config)?),
            Arc::new(HlsStrategy::new(sink.clone(), &config)?),
        ];
        Ok(Self::new(slot, request, strategies, sink, config))
    }

    pub fn mode(&self) -> PlaybackMode {
        self.shared.request.mode
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn is_stream_active(&self) -> bool {
        self.shared.control().stream_active
    }

    /// Tell the session whether the server expects the stream to be live.
    ///
    /// Turning it on connects; turning it off tears down and stays
    /// disconnected without touching the network.
    pub async fn set_stream_active(&self, active: bool) -> ConnectionState {
        let was_active = std::mem::replace(&mut self.shared.control().stream_active, active);

        if active {
            if was_active && self.shared.state() != ConnectionState::Disconnected {
                return self.shared.state();
            }
            self.shared.connect().await
        } else {
            self.shared.cleanup().await;
            self.shared.publish(|s| {
                s.state = ConnectionState::Disconnected;
                s.transport = TransportKind::None;
                s.error = None;
            });
            ConnectionState::Disconnected
        }
    }

    /// Start a connect attempt, superseding any attempt in flight.
    ///
    /// Does not consume the retry budget and never retries on its own.
    pub async fn connect(&self) -> ConnectionState {
        self.shared.connect().await
    }

    /// Retry after an error or a dropped link.
    ///
    /// Each call uses one attempt from the budget; once it is spent the
    /// call fails with `LimitReached` and the snapshot shows retry as
    /// unavailable.
    pub async fn retry(&self) -> Result<ConnectionState, RetryError> {
        self.shared.retry().await
    }

    /// Close any transport, cancel pending timers and detach the sink.
    pub async fn cleanup(&self) {
        self.shared.cleanup().await;
    }

    /// Tear the session down.
    pub async fn close(self) {
        self.shared.cleanup().await;
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.driver.abort();
        self.shared.control().supersede();

        // Dropped without `close()`: finish the teardown in the background
        let open = self
            .shared
            .transport
            .try_lock()
            .map_or(true, |transport| transport.is_some());
        if open {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let shared = self.shared.clone();
                handle.spawn(async move { shared.cleanup().await });
            }
        }
    }
}
