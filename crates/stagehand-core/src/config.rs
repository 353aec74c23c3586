//! Relay process configuration and validation.
//!
//! `RelayProcessConfig` is immutable once the relay has been started: the
//! supervisor takes it by value at construction and a change requires a
//! stop/restart cycle with a new supervisor.

use serde::{Deserialize, Serialize};

/// Default RTMP ingest port.
pub const DEFAULT_RTMP_PORT: u16 = 1935;

/// Default WebRTC (WHEP) playback port.
pub const DEFAULT_WEBRTC_PORT: u16 = 8889;

/// Default HLS playback port.
pub const DEFAULT_HLS_PORT: u16 = 8888;

/// Default port of the relay's own control API.
pub const DEFAULT_API_PORT: u16 = 9997;

/// Default publish path the dashboard expects the encoder to push to.
pub const DEFAULT_STREAM_PATH: &str = "live";

/// Ports and addressing for the external relay process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayProcessConfig {
    /// RTMP ingest port.
    pub rtmp_port: u16,
    /// Low-latency (WebRTC) playback port.
    pub webrtc_port: u16,
    /// Buffered (HLS) playback port.
    pub hls_port: u16,
    /// Port of the relay's control API (loopback only).
    pub api_port: u16,
    /// Whether the relay feature is enabled at all.
    pub enabled: bool,
    /// Host name browsers use to reach the relay's public ports.
    pub public_host: String,
    /// Publish path name, e.g. `live` for `rtmp://host:1935/live`.
    pub stream_path: String,
}

impl Default for RelayProcessConfig {
    fn default() -> Self {
        Self {
            rtmp_port: DEFAULT_RTMP_PORT,
            webrtc_port: DEFAULT_WEBRTC_PORT,
            hls_port: DEFAULT_HLS_PORT,
            api_port: DEFAULT_API_PORT,
            enabled: true,
            public_host: "localhost".to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
        }
    }
}

impl RelayProcessConfig {
    /// URL an encoder publishes to.
    pub fn rtmp_ingest_url(&self) -> String {
        format!(
            "rtmp://{}:{}/{}",
            self.public_host, self.rtmp_port, self.stream_path
        )
    }

    /// WHEP signaling endpoint for low-latency playback.
    pub fn webrtc_playback_url(&self) -> String {
        format!(
            "http://{}:{}/{}/whep",
            self.public_host, self.webrtc_port, self.stream_path
        )
    }

    /// Multivariant playlist URL for buffered playback.
    pub fn hls_playback_url(&self) -> String {
        format!(
            "http://{}:{}/{}/index.m3u8",
            self.public_host, self.hls_port, self.stream_path
        )
    }

    /// Base URL of the control API. Always loopback.
    pub fn api_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.api_port)
    }

    /// All ports the relay listens on, in a fixed order.
    pub const fn ports(&self) -> [u16; 4] {
        [self.rtmp_port, self.webrtc_port, self.hls_port, self.api_port]
    }
}

/// Relay configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    PrivilegedPort(u16),

    #[error("Port {0} is assigned to more than one relay listener")]
    DuplicatePort(u16),

    #[error("Stream path cannot be empty")]
    EmptyStreamPath,

    #[error("Stream path must not start or end with '/', got {0:?}")]
    InvalidStreamPath(String),

    #[error("Public host cannot be empty")]
    EmptyPublicHost,
}

/// Validate a relay configuration before it is handed to the supervisor.
pub fn validate_relay_config(config: &RelayProcessConfig) -> Result<(), ConfigError> {
    let ports = config.ports();
    for (i, port) in ports.iter().enumerate() {
        if *port < 1024 {
            return Err(ConfigError::PrivilegedPort(*port));
        }
        if ports[..i].contains(port) {
            return Err(ConfigError::DuplicatePort(*port));
        }
    }

    if config.stream_path.is_empty() {
        return Err(ConfigError::EmptyStreamPath);
    }
    if config.stream_path.starts_with('/') || config.stream_path.ends_with('/') {
        return Err(ConfigError::InvalidStreamPath(config.stream_path.clone()));
    }

    if config.public_host.trim().is_empty() {
        return Err(ConfigError::EmptyPublicHost);
    }

    Ok(())
}
