//! Core domain types for stagehand.
//!
//! This crate holds the types shared by the relay supervisor (server side),
//! the playback negotiator (client side) and the HTTP adapter. It contains
//! no process, filesystem-watching or network code.
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod events;
pub mod paths;
pub mod playback;
pub mod state;
pub mod status;
pub mod stream;

pub use config::{
    ConfigError, DEFAULT_API_PORT, DEFAULT_HLS_PORT, DEFAULT_RTMP_PORT, DEFAULT_STREAM_PATH,
    DEFAULT_WEBRTC_PORT, RelayProcessConfig, validate_relay_config,
};
pub use error::{ControlApiError, RelayError};
pub use events::{RelayEvent, RelayLogEntry};
pub use paths::{PathError, data_root, relay_binary_default_path, relay_config_file};
pub use playback::{ConnectionState, PlaybackMode, PlaybackSnapshot, TransportKind};
pub use state::RelayProcessState;
pub use status::{RelayStatus, StreamState};
pub use stream::{PathList, StreamPath, StreamTrack, TrackKind};
