//! Negotiator timing and HLS tuning.

use std::time::Duration;

/// Live-latency settings handed to the HLS player.
///
/// Segment counts are measured from the live edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HlsTuning {
    pub low_latency: bool,
    /// Target distance from the live edge.
    pub live_sync_segments: u32,
    /// Maximum distance before the player seeks back to the live edge.
    pub live_max_latency_segments: u32,
    /// Retries for recoverable network errors while loading playlists.
    pub manifest_retries: u32,
}

impl Default for HlsTuning {
    fn default() -> Self {
        Self {
            low_latency: true,
            live_sync_segments: 1,
            live_max_latency_segments: 3,
            manifest_retries: 2,
        }
    }
}

/// Negotiator configuration shared by every session of a client.
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Upper bound on full (non-trickle) ICE gathering and on reaching a
    /// connected peer connection after the answer is applied.
    pub ice_timeout: Duration,
    /// Upper bound on the WHEP offer/answer exchange.
    pub signaling_timeout: Duration,
    /// Upper bound on loading and parsing the HLS manifest.
    pub hls_manifest_timeout: Duration,
    /// Upper bound on native HLS playback reporting loaded metadata.
    pub hls_metadata_timeout: Duration,
    /// Manual/automatic retry budget per session.
    pub max_reconnect_attempts: u32,
    /// Delay before reconnecting automatically after a live link drops.
    /// `None` disables automatic reconnection.
    pub auto_reconnect_delay: Option<Duration>,
    /// STUN/TURN URLs. Empty means host candidates only.
    pub ice_servers: Vec<String>,
    pub hls: HlsTuning,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            ice_timeout: Duration::from_secs(5),
            signaling_timeout: Duration::from_secs(5),
            hls_manifest_timeout: Duration::from_secs(10),
            hls_metadata_timeout: Duration::from_secs(10),
            max_reconnect_attempts: 3,
            auto_reconnect_delay: Some(Duration::from_secs(2)),
            ice_servers: Vec::new(),
            hls: HlsTuning::default(),
        }
    }
}
