//! Subcommands and their arguments.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::{Args, Subcommand};
use stagehand_core::{
    DEFAULT_API_PORT, DEFAULT_HLS_PORT, DEFAULT_RTMP_PORT, DEFAULT_STREAM_PATH,
    DEFAULT_WEBRTC_PORT, PlaybackMode, RelayProcessConfig,
};
use stagehand_playback::OpenRequest;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API around the relay supervisor
    Serve(ServeArgs),

    /// Connect to a relay stream headlessly and log connection state changes
    Probe(ProbeArgs),

    /// Inspect the local relay
    Relay {
        #[command(subcommand)]
        command: RelayCommand,
    },
}

/// Relay inspection commands.
#[derive(Subcommand)]
pub enum RelayCommand {
    /// Show binary availability, control API reachability and publish paths
    Status(RelayArgs),
}

/// Relay ports and addressing.
#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// RTMP ingest port
    #[arg(long, env = "STAGEHAND_RTMP_PORT", default_value_t = DEFAULT_RTMP_PORT)]
    pub rtmp_port: u16,

    /// WebRTC (WHEP) playback port
    #[arg(long, env = "STAGEHAND_WEBRTC_PORT", default_value_t = DEFAULT_WEBRTC_PORT)]
    pub webrtc_port: u16,

    /// HLS playback port
    #[arg(long, env = "STAGEHAND_HLS_PORT", default_value_t = DEFAULT_HLS_PORT)]
    pub hls_port: u16,

    /// Relay control API port
    #[arg(long, env = "STAGEHAND_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Host browsers use to reach the relay's playback ports
    #[arg(long, env = "STAGEHAND_PUBLIC_HOST", default_value = "localhost")]
    pub public_host: String,

    /// Publish path the encoder pushes to
    #[arg(long, env = "STAGEHAND_STREAM_PATH", default_value = DEFAULT_STREAM_PATH)]
    pub stream_path: String,

    /// Path to the MediaMTX binary (defaults to STAGEHAND_MEDIAMTX_PATH, then PATH)
    #[arg(long)]
    pub mediamtx: Option<PathBuf>,
}

impl RelayArgs {
    pub fn to_config(&self) -> RelayProcessConfig {
        RelayProcessConfig {
            rtmp_port: self.rtmp_port,
            webrtc_port: self.webrtc_port,
            hls_port: self.hls_port,
            api_port: self.api_port,
            enabled: true,
            public_host: self.public_host.clone(),
            stream_path: self.stream_path.clone(),
        }
    }
}

/// Arguments for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port for the HTTP API
    #[arg(short, long, env = "STAGEHAND_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind the HTTP API to
    #[arg(long, env = "STAGEHAND_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Allowed CORS origin (repeatable); all origins are allowed when omitted
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// Start the relay as soon as the server is up
    #[arg(long, env = "STAGEHAND_AUTOSTART")]
    pub autostart: bool,

    /// Seconds to wait for the relay's control API after spawning
    #[arg(long, default_value_t = 10)]
    pub readiness_timeout: u64,

    #[command(flatten)]
    pub relay: RelayArgs,
}

/// Arguments for `probe`.
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Playback mode: audio or audio_video
    #[arg(long, default_value = "audio_video")]
    pub mode: PlaybackMode,

    /// WHEP endpoint; derived from the relay settings when omitted
    #[arg(long)]
    pub webrtc_url: Option<String>,

    /// HLS playlist; derived from the relay settings when omitted
    #[arg(long)]
    pub hls_url: Option<String>,

    /// Seconds to keep the session open
    #[arg(long, default_value_t = 30)]
    pub duration: u64,

    /// Retry after errors until the reconnect budget is spent
    #[arg(long)]
    pub retry: bool,

    #[command(flatten)]
    pub relay: RelayArgs,
}

impl ProbeArgs {
    pub fn open_request(&self) -> OpenRequest {
        let config = self.relay.to_config();
        OpenRequest::new(
            self.mode,
            self.webrtc_url
                .clone()
                .unwrap_or_else(|| config.webrtc_playback_url()),
            self.hls_url
                .clone()
                .unwrap_or_else(|| config.hls_playback_url()),
        )
    }
}
