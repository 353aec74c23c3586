//! MediaMTX binary availability checking and path resolution.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides binary resolution.
pub const BINARY_ENV_VAR: &str = "STAGEHAND_MEDIAMTX_PATH";

/// Errors that can occur when resolving or validating the relay binary.
#[derive(Debug, Error)]
pub enum BinaryError {
    /// The binary was not found at the expected location.
    #[error("MediaMTX binary not found at: {path}")]
    NotFound { path: PathBuf },

    /// The binary exists but is not executable.
    #[error("MediaMTX binary exists but is not executable: {path}")]
    NotExecutable { path: PathBuf },

    /// Failed to resolve the path (e.g., data directory not available).
    #[error("Failed to resolve MediaMTX path: {0}")]
    PathResolution(String),
}

impl BinaryError {
    /// The path that was checked, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path } | Self::NotExecutable { path } => Some(path),
            Self::PathResolution(_) => None,
        }
    }
}

/// Resolve the relay binary path.
///
/// Precedence:
/// 1. `explicit` (e.g. a CLI flag)
/// 2. `STAGEHAND_MEDIAMTX_PATH`
/// 3. `mediamtx` on `PATH`
/// 4. `<data root>/bin/mediamtx`
///
/// The candidate from the first source that provides one is validated;
/// later sources are not consulted if it fails.
pub fn resolve_relay_binary(explicit: Option<&Path>) -> Result<PathBuf, BinaryError> {
    if let Some(path) = explicit {
        return validate_binary(path);
    }

    if let Ok(env_path) = std::env::var(BINARY_ENV_VAR) {
        return validate_binary(Path::new(&env_path));
    }

    if let Ok(found) = which::which("mediamtx") {
        return validate_binary(&found);
    }

    let default_path = stagehand_core::relay_binary_default_path()
        .map_err(|e| BinaryError::PathResolution(e.to_string()))?;
    validate_binary(&default_path)
}

/// Validate that a binary exists and is executable.
pub fn validate_binary(path: &Path) -> Result<PathBuf, BinaryError> {
    if !path.is_file() {
        return Err(BinaryError::NotFound {
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)
            .map_err(|e| {
                BinaryError::PathResolution(format!(
                    "Failed to read metadata for {}: {}",
                    path.display(),
                    e
                ))
            })?
            .permissions()
            .mode();
        // Any execute bit (owner, group, or other)
        if mode & 0o111 == 0 {
            return Err(BinaryError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(path.to_path_buf())
}

/// Cheap synchronous check used by `is_binary_available`.
pub fn is_executable(path: &Path) -> bool {
    validate_binary(path).is_ok()
}
