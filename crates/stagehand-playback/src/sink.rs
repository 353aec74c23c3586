//! The preview surface seam.
//!
//! Sessions hand media to a `MediaSink` and never render anything
//! themselves. An audio-only session never attaches video to its sink.

use std::sync::Arc;

use async_trait::async_trait;
pub use webrtc::track::track_remote::TrackRemote;

use crate::config::HlsTuning;
use crate::error::TransportError;
use crate::hls::MultivariantPlaylist;

/// Kind of a received media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// An HLS stream ready for a client-side player.
#[derive(Debug, Clone)]
pub struct HlsSource {
    pub url: String,
    pub playlist: MultivariantPlaylist,
    pub tuning: HlsTuning,
    /// `false` for audio-only sessions.
    pub include_video: bool,
}

/// Playback element the negotiator renders into.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Attach a received WebRTC track.
    fn attach_track(&self, kind: MediaKind, track: Arc<TrackRemote>);

    /// Whether the element plays HLS without a client-side library.
    fn supports_native_hls(&self) -> bool;

    /// Point the element at `url` and resolve once metadata has loaded.
    async fn load_native_hls(&self, url: &str, include_video: bool) -> Result<(), TransportError>;

    /// Attach a parsed HLS stream to the client-side player.
    fn attach_hls(&self, source: HlsSource);

    /// Drop whatever media is attached. Must be idempotent.
    fn detach(&self);
}
