//! Spawning the relay binary.
//!
//! The supervisor talks to the relay process only through these traits so
//! lifecycle logic can be exercised without a real MediaMTX install.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagehand_core::RelayError;
use tokio::process::{Child, Command};
use tracing::debug;

use super::logs::{RelayLogBuffer, spawn_stream_reader};
use super::shutdown::shutdown_child;
use crate::binary::is_executable;

/// A spawned relay process owned by the supervisor.
#[async_trait]
pub trait RelayProcess: Send {
    /// OS process id, if the process is local and still known.
    fn pid(&self) -> Option<u32>;

    /// Non-blocking exit check. Returns a description of the exit status
    /// once the process has terminated.
    fn try_exit(&mut self) -> Option<String>;

    /// Request graceful termination, force-killing after `grace`.
    async fn terminate(&mut self, grace: Duration) -> std::io::Result<()>;
}

/// Starts relay processes.
#[async_trait]
pub trait RelayLauncher: Send + Sync {
    /// Path of the binary this launcher runs.
    fn binary_path(&self) -> &Path;

    /// Cheap existence/executability check. Starts nothing.
    fn is_available(&self) -> bool;

    /// Spawn the relay with the given configuration file. Output lines go to `logs`.
    async fn launch(
        &self,
        config_file: &Path,
        logs: Arc<RelayLogBuffer>,
    ) -> Result<Box<dyn RelayProcess>, RelayError>;
}

/// Launches the MediaMTX binary from a fixed path.
#[derive(Debug, Clone)]
pub struct BinaryLauncher {
    binary: PathBuf,
}

impl BinaryLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl RelayLauncher for BinaryLauncher {
    fn binary_path(&self) -> &Path {
        &self.binary
    }

    fn is_available(&self) -> bool {
        is_executable(&self.binary)
    }

    async fn launch(
        &self,
        config_file: &Path,
        logs: Arc<RelayLogBuffer>,
    ) -> Result<Box<dyn RelayProcess>, RelayError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(config_file)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| RelayError::SpawnFailed(e.to_string()))?;

        debug!(
            binary = %self.binary.display(),
            config = %config_file.display(),
            pid = ?child.id(),
            "Spawned relay process"
        );

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, "stdout", logs.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, "stderr", logs);
        }

        Ok(Box::new(ChildProcess { child }))
    }
}

/// `RelayProcess` backed by a tokio child.
struct ChildProcess {
    child: Child,
}

#[async_trait]
impl RelayProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(format!("unknown exit status ({e})")),
        }
    }

    async fn terminate(&mut self, grace: Duration) -> std::io::Result<()> {
        let status = shutdown_child(&mut self.child, grace).await?;
        debug!(%status, "Relay process reaped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::broadcaster::RelayEventBroadcaster;

    fn logs() -> Arc<RelayLogBuffer> {
        Arc::new(RelayLogBuffer::new(Arc::new(RelayEventBroadcaster::new())))
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let launcher = BinaryLauncher::new("/nonexistent/mediamtx");
        assert!(!launcher.is_available());
    }

    #[tokio::test]
    async fn test_launch_missing_binary_is_spawn_failure() {
        let launcher = BinaryLauncher::new("/nonexistent/mediamtx");
        let result = launcher.launch(Path::new("/tmp/mediamtx.yml"), logs()).await;
        assert!(matches!(result, Err(RelayError::SpawnFailed(_))));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_launch_captures_output_and_terminates() {
        // `echo` prints its argument (the config path) and exits
        let launcher = BinaryLauncher::new("/bin/echo");
        let logs = logs();
        let mut process = launcher
            .launch(Path::new("relay.yml"), logs.clone())
            .await
            .expect("echo should spawn");

        for _ in 0..50 {
            if !logs.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(logs.entries()[0].line, "relay.yml");

        process.terminate(Duration::from_secs(1)).await.unwrap();
        assert!(process.try_exit().is_some());
    }
}
