//! Readiness and liveness checks for the relay process.

use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::api::RelayApiClient;
use crate::process::RelayProcess;

/// Why the relay did not become ready.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// The process exited before its control API answered.
    #[error("relay exited during startup ({0})")]
    Exited(String),

    /// The control API did not answer before the deadline.
    #[error("relay did not become ready in time: {last_error}")]
    TimedOut { last_error: String },
}

/// Wait for the relay's control API to answer.
///
/// Polls the probe endpoint every `poll_interval` until it succeeds, the
/// process exits, or `timeout` elapses.
pub async fn wait_for_relay_ready(
    api: &RelayApiClient,
    process: &mut dyn RelayProcess,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ReadinessError> {
    info!("Waiting for MediaMTX control API at {}", api.base_url());

    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if let Some(status) = process.try_exit() {
            return Err(ReadinessError::Exited(status));
        }

        let last_error = match api.probe().await {
            Ok(()) => {
                info!(attempts = attempt, "MediaMTX is ready");
                return Ok(());
            }
            Err(e) => {
                debug!(attempt, error = %e, "Readiness probe failed, retrying...");
                e.to_string()
            }
        };

        if Instant::now() + poll_interval >= deadline {
            return Err(ReadinessError::TimedOut { last_error });
        }
        sleep(poll_interval).await;
    }
}

/// Check if a process is alive and not a zombie.
pub fn check_process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    system.process(pid).is_some_and(|process| {
        matches!(
            process.status(),
            ProcessStatus::Run | ProcessStatus::Sleep | ProcessStatus::Idle
        )
    })
}
