//! Error taxonomy for the relay supervisor.
//!
//! Idempotent outcomes (start while running, stop while stopped) are not
//! errors; they are reported through the supervisor's outcome enums.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from relay lifecycle operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay binary is missing or not executable. Fatal until an
    /// operator installs it; never retried automatically.
    #[error(
        "MediaMTX binary not found at {path}. Install MediaMTX or set STAGEHAND_MEDIAMTX_PATH."
    )]
    Unavailable { path: PathBuf },

    /// Writing the generated relay configuration failed.
    #[error("Failed to write relay configuration to {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    /// The process could not be spawned or exited during startup.
    #[error("Failed to spawn MediaMTX: {0}")]
    SpawnFailed(String),

    /// The control API did not answer the readiness probe in time.
    #[error("MediaMTX failed to become ready within {timeout_secs}s on API port {port}")]
    HealthTimeout { timeout_secs: u64, port: u16 },

    /// Terminating the process failed.
    #[error("Failed to stop MediaMTX: {0}")]
    StopFailed(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Stable discriminant for API clients.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "RELAY_UNAVAILABLE",
            Self::ConfigWrite { .. } => "RELAY_CONFIG_WRITE_FAILED",
            Self::SpawnFailed(_) => "RELAY_SPAWN_FAILED",
            Self::HealthTimeout { .. } => "RELAY_HEALTH_TIMEOUT",
            Self::StopFailed(_) => "RELAY_STOP_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Errors from the relay's control API.
///
/// Callers that only need "reachable or not" collapse these to `None`
/// rather than propagating them, so "server unreachable" stays distinct
/// from "not running".
#[derive(Debug, Error)]
pub enum ControlApiError {
    /// Connection refused, timed out, or otherwise failed at transport level.
    #[error("Control API unreachable: {0}")]
    Unreachable(String),

    /// The API answered with a non-success status.
    #[error("Control API returned status {0}")]
    Status(u16),

    /// The API answered with a body that could not be decoded.
    #[error("Control API returned an unexpected body: {0}")]
    Decode(String),
}
