//! Playback negotiation errors.

use stagehand_core::ConnectionState;
use thiserror::Error;

/// Why a transport could not be opened or was lost.
///
/// Every variant except `Superseded` makes the session try the next
/// transport; the user only sees an error once all of them failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The offer/answer exchange failed: network error, non-2xx response,
    /// or a body that is not a usable SDP answer.
    #[error("signaling failed: {0}")]
    Signaling(String),

    /// ICE gathering or connectivity checks did not complete.
    #[error("ICE failed: {0}")]
    Ice(String),

    /// Building or configuring the peer connection failed.
    #[error("peer connection error: {0}")]
    PeerConnection(String),

    /// The HLS manifest could not be loaded or parsed.
    #[error("HLS playback failed: {0}")]
    Hls(String),

    /// The preview surface rejected the media.
    #[error("media sink error: {0}")]
    Sink(String),

    /// A newer connect attempt took over; the partial transport was torn down.
    #[error("connection attempt superseded")]
    Superseded,
}

impl From<webrtc::Error> for TransportError {
    fn from(e: webrtc::Error) -> Self {
        Self::PeerConnection(e.to_string())
    }
}

/// Why a retry was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError {
    /// The session used up its reconnect budget.
    #[error("Maximum reconnection attempts reached ({max})")]
    LimitReached { max: u32 },

    /// Retry only applies to failed or dropped sessions.
    #[error("cannot retry while {0}")]
    NotRetryable(ConnectionState),
}
