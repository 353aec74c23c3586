//! Path utilities for stagehand data directories.
//!
//! Resolution order for the data root:
//! 1. `STAGEHAND_DATA_DIR` environment variable
//! 2. `<local data dir>/stagehand`

use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// File name of the generated relay configuration.
const RELAY_CONFIG_FILE: &str = "mediamtx.yml";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Could not determine the local data directory for this platform")]
    NoDataDir,

    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Root directory for stagehand's runtime data. Created if missing.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var("STAGEHAND_DATA_DIR") {
        Ok(path) => PathBuf::from(path),
        Err(_) => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("stagehand"),
    };

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| PathError::CreateFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(root)
}

/// Where the relay binary is expected when it is neither configured
/// explicitly nor found on `PATH`.
pub fn relay_binary_default_path() -> Result<PathBuf, PathError> {
    let name = if cfg!(windows) {
        "mediamtx.exe"
    } else {
        "mediamtx"
    };
    Ok(data_root()?.join("bin").join(name))
}

/// Location of the generated relay configuration file.
pub fn relay_config_file() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(RELAY_CONFIG_FILE))
}
