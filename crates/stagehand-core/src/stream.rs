//! Read-only projections of the relay's publish paths.
//!
//! These are fetched on demand from the control API and never cached by
//! the supervisor.

use serde::{Deserialize, Serialize};

/// Media kind of a track, derived from its codec name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

impl TrackKind {
    /// Classify a codec name as reported by the relay (e.g. `H264`, `MPEG-4 Audio`).
    pub fn from_codec(codec: &str) -> Self {
        let normalized = codec.to_ascii_uppercase();
        const VIDEO: &[&str] = &[
            "H264", "H265", "AV1", "VP8", "VP9", "MJPEG", "MPEG-1/2 VIDEO", "MPEG-4 VIDEO",
        ];
        const AUDIO: &[&str] = &[
            "OPUS",
            "MPEG-4 AUDIO",
            "MPEG-4 AUDIO LATM",
            "MPEG-1/2 AUDIO",
            "AC-3",
            "G711",
            "G722",
            "LPCM",
        ];

        if VIDEO.contains(&normalized.as_str()) {
            Self::Video
        } else if AUDIO.contains(&normalized.as_str()) || normalized.contains("AUDIO") {
            Self::Audio
        } else {
            Self::Other
        }
    }
}

/// A single track of a publish path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTrack {
    pub kind: TrackKind,
    pub codec: String,
}

impl StreamTrack {
    pub fn from_codec(codec: impl Into<String>) -> Self {
        let codec = codec.into();
        Self {
            kind: TrackKind::from_codec(&codec),
            codec,
        }
    }
}

/// A publish path as reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPath {
    pub name: String,
    /// True when a source is publishing and the path is readable.
    pub ready: bool,
    pub tracks: Vec<StreamTrack>,
    pub reader_count: usize,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

impl StreamPath {
    /// Whether this path has a live source.
    pub const fn is_live(&self) -> bool {
        self.ready
    }

    pub fn has_video(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == TrackKind::Video)
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == TrackKind::Audio)
    }
}

/// A page of publish paths with the relay's item/page counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathList {
    pub item_count: usize,
    pub page_count: usize,
    pub items: Vec<StreamPath>,
}

impl PathList {
    /// Whether any path reports a live source.
    pub fn any_live(&self) -> bool {
        self.items.iter().any(StreamPath::is_live)
    }
}
