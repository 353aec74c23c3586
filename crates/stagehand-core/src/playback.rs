//! Playback session types shared by the negotiator and its consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a preview slot asks the relay for. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Audio receive only; a video element is never attached.
    Audio,
    AudioVideo,
}

impl PlaybackMode {
    pub const fn wants_video(self) -> bool {
        matches!(self, Self::AudioVideo)
    }
}

impl std::str::FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "audio_video" | "audio-video" => Ok(Self::AudioVideo),
            other => Err(format!("unknown playback mode: {other}")),
        }
    }
}

/// UI-visible connection state of a playback session.
///
/// ```text
/// disconnected ──▶ connecting ──▶ connected ──close──▶ disconnected
///                      │
///                      └──both transports failed──▶ error ──retry──▶ connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Transport currently carrying media for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    None,
    Webrtc,
    Hls,
}

/// Point-in-time view of a playback session, published to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub mode: PlaybackMode,
    pub state: ConnectionState,
    pub transport: TransportKind,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    /// False once the retry budget is exhausted.
    pub retry_available: bool,
    pub error: Option<String>,
}

impl PlaybackSnapshot {
    pub const fn new(mode: PlaybackMode, max_reconnect_attempts: u32) -> Self {
        Self {
            mode,
            state: ConnectionState::Disconnected,
            transport: TransportKind::None,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            retry_available: true,
            error: None,
        }
    }
}
