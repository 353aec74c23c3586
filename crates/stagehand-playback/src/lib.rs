//! Client-side playback negotiation for stagehand.
//!
//! A `PlaybackSession` drives one preview slot: it tries WebRTC (WHEP
//! signaling, full ICE gathering) first and falls back to HLS, exposes the
//! resulting connection state, and bounds reconnection attempts.
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hls;
pub mod rtc;
mod session;
pub mod sink;
pub mod transport;

pub use config::{HlsTuning, NegotiatorConfig};
pub use error::{RetryError, TransportError};
pub use hls::HlsStrategy;
pub use rtc::{WebRtcStrategy, WhepAnswer, WhepClient};
pub use session::{PlaybackSession, RETRY_LIMIT_MESSAGE};
pub use sink::{HlsSource, MediaKind, MediaSink, TrackRemote};
pub use transport::{ActiveTransport, LinkState, OpenRequest, PlaybackStrategy, TransportEvents};
