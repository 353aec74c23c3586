//! Transport strategies and the contract between them and a session.
//!
//! A session tries its strategies in order; each either hands back an
//! `ActiveTransport` that is already delivering media, or fails and leaves
//! nothing behind. Adding a transport means adding a strategy to the list.

use std::future::Future;

use async_trait::async_trait;
use stagehand_core::{PlaybackMode, TransportKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::TransportError;

/// What a session asks its strategies to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub mode: PlaybackMode,
    /// WHEP endpoint, e.g. `http://host:8889/live/whep`.
    pub webrtc_url: String,
    /// Multivariant playlist, e.g. `http://host:8888/live/index.m3u8`.
    pub hls_url: String,
}

impl OpenRequest {
    pub fn new(mode: PlaybackMode, webrtc_url: impl Into<String>, hls_url: impl Into<String>) -> Self {
        Self {
            mode,
            webrtc_url: webrtc_url.into(),
            hls_url: hls_url.into(),
        }
    }
}

/// Link changes reported by an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    /// The transport closed or disconnected after opening.
    Lost(String),
    /// Playback hit an unrecoverable error after opening.
    Failed(String),
}

/// A link change tagged with the connect attempt it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkEvent {
    pub generation: u64,
    pub state: LinkState,
}

/// Handle a strategy uses to report back to its session.
///
/// Tagged with the attempt's generation, so reports from a superseded
/// attempt are discarded by the session instead of touching newer state.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    generation: u64,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl TransportEvents {
    pub(crate) const fn new(
        generation: u64,
        cancel: CancellationToken,
        tx: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        Self {
            generation,
            cancel,
            tx,
        }
    }

    /// Events that report nowhere. For driving a strategy on its own.
    pub fn detached() -> Self {
        let (tx, _) = mpsc::unbounded_channel();
        Self::new(0, CancellationToken::new(), tx)
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a newer attempt has taken over.
    pub fn is_superseded(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, state: LinkState) {
        trace!(generation = self.generation, ?state, "Link state report");
        let _ = self.tx.send(LinkEvent {
            generation: self.generation,
            state,
        });
    }

    /// Run `fut` unless the attempt is superseded first.
    ///
    /// The caller still owns whatever it built so far and must tear it down
    /// on `Err(Superseded)`.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(TransportError::Superseded),
            out = fut => Ok(out),
        }
    }
}

/// A way of turning an `OpenRequest` into playing media.
#[async_trait]
pub trait PlaybackStrategy: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Open the transport and attach its media to the session's sink.
    ///
    /// On error everything built by this call must already be closed.
    async fn open(
        &self,
        request: &OpenRequest,
        events: TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError>;
}

/// A transport that is delivering media.
#[async_trait]
pub trait ActiveTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Tear the transport down. Must be idempotent.
    async fn close(&mut self);
}
