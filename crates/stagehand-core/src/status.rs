//! Externally consumed relay status.

use serde::{Deserialize, Serialize};

use crate::config::RelayProcessConfig;
use crate::state::RelayProcessState;

/// Whether a live source is publishing, as far as we can tell.
///
/// `Unknown` covers a running relay whose control API did not answer,
/// e.g. while it is still starting up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Active,
    Idle,
    Unknown,
}

/// Combined supervisor + relay status object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    /// Relay binary is present and executable.
    pub enabled: bool,
    /// Supervisor state is `Running`.
    pub server_running: bool,
    /// At least one path has a live source. `false` when that cannot be
    /// determined; see `stream_state`.
    pub stream_active: bool,
    pub stream_state: StreamState,
    pub state: RelayProcessState,
    pub rtmp_ingest_url: String,
    pub webrtc_playback_url: String,
    pub hls_playback_url: String,
}

impl RelayStatus {
    /// Build a status from its parts. `live` is `None` when the control API
    /// could not be asked (not running) or did not answer.
    pub fn compose(
        config: &RelayProcessConfig,
        enabled: bool,
        state: RelayProcessState,
        live: Option<bool>,
    ) -> Self {
        let stream_state = match live {
            Some(true) => StreamState::Active,
            Some(false) => StreamState::Idle,
            None if state.is_running() => StreamState::Unknown,
            None => StreamState::Idle,
        };

        Self {
            enabled,
            server_running: state.is_running(),
            stream_active: stream_state == StreamState::Active,
            stream_state,
            state,
            rtmp_ingest_url: config.rtmp_ingest_url(),
            webrtc_playback_url: config.webrtc_playback_url(),
            hls_playback_url: config.hls_playback_url(),
        }
    }
}
