//! Relay process supervisor.
//!
//! One `RelaySupervisor` owns one relay process. Start and stop are
//! serialized through the lifecycle lock; state reads go through a watch
//! channel so status queries never block behind a start in progress and
//! always observe a single consistent value.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::StreamExt;
use stagehand_core::{
    PathList, RelayError, RelayEvent, RelayLogEntry, RelayProcessConfig, RelayProcessState,
    RelayStatus,
};
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::RelayApiClient;
use crate::health::{ReadinessError, wait_for_relay_ready};
use crate::monitor::{RelayHealth, RelayHealthMonitor};
use crate::process::{
    BinaryLauncher, RelayEventBroadcaster, RelayLauncher, RelayLogBuffer, RelayProcess,
};
use crate::relay_config::write_relay_config;

/// Timing knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// How long `start()` waits for the control API to answer.
    pub readiness_timeout: Duration,
    /// Delay between readiness probes.
    pub probe_interval: Duration,
    /// Per-request timeout for control API calls.
    pub api_timeout: Duration,
    /// Time between SIGTERM and SIGKILL on stop.
    pub stop_grace: Duration,
    /// Health monitor interval while running.
    pub monitor_interval: Duration,
    /// Consecutive failed health probes before a running relay is marked failed.
    pub failure_threshold: u32,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(10),
            probe_interval: Duration::from_millis(250),
            api_timeout: Duration::from_secs(2),
            stop_grace: Duration::from_secs(5),
            monitor_interval: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

/// Result of a successful `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new relay process was spawned and answered its readiness probe.
    Started(RelayProcessConfig),
    /// The relay was already running; nothing was spawned.
    AlreadyRunning(RelayProcessConfig),
}

impl StartOutcome {
    pub fn config(&self) -> &RelayProcessConfig {
        match self {
            Self::Started(config) | Self::AlreadyRunning(config) => config,
        }
    }
}

/// Result of a successful `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

struct Lifecycle {
    process: Option<Box<dyn RelayProcess>>,
    monitor: Option<CancellationToken>,
}

struct Inner {
    config: RelayProcessConfig,
    settings: SupervisorSettings,
    config_file: PathBuf,
    launcher: Arc<dyn RelayLauncher>,
    api: RelayApiClient,
    state: watch::Sender<RelayProcessState>,
    lifecycle: Mutex<Lifecycle>,
    events: Arc<RelayEventBroadcaster>,
    logs: Arc<RelayLogBuffer>,
}

impl Inner {
    /// Apply a transition if it is legal from the current state.
    fn transition(&self, next: RelayProcessState, event: RelayEvent) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        if changed {
            debug!(state = %next, "Relay state changed");
            self.events.broadcast(event);
        } else {
            warn!(
                from = %*self.state.borrow(),
                to = %next,
                "Ignoring illegal relay state transition"
            );
        }
        changed
    }

    fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(%reason, "Relay failed");
        self.transition(RelayProcessState::Failed, RelayEvent::failed(reason));
    }

    /// Mark a running relay as failed. No-op if the state moved on.
    fn fail_if_running(&self, reason: String) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_running() {
                *state = RelayProcessState::Failed;
                true
            } else {
                false
            }
        });
        if changed {
            error!(%reason, "Relay crashed");
            self.events.broadcast(RelayEvent::failed(reason));
        }
    }
}

/// Supervisor for the MediaMTX relay process.
///
/// Cheap to clone; clones share the same process and state.
#[derive(Clone)]
pub struct RelaySupervisor {
    inner: Arc<Inner>,
}

impl RelaySupervisor {
    /// Create a supervisor around an arbitrary launcher.
    pub fn new(
        config: RelayProcessConfig,
        settings: SupervisorSettings,
        config_file: impl Into<PathBuf>,
        launcher: Arc<dyn RelayLauncher>,
    ) -> Result<Self, RelayError> {
        let api = RelayApiClient::new(config.api_base_url(), settings.api_timeout)
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        let events = Arc::new(RelayEventBroadcaster::new());
        let logs = Arc::new(RelayLogBuffer::new(events.clone()));
        let (state, _) = watch::channel(RelayProcessState::Stopped);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                settings,
                config_file: config_file.into(),
                launcher,
                api,
                state,
                lifecycle: Mutex::new(Lifecycle {
                    process: None,
                    monitor: None,
                }),
                events,
                logs,
            }),
        })
    }

    /// Create a supervisor that runs the MediaMTX binary at `binary`.
    pub fn with_binary(
        config: RelayProcessConfig,
        settings: SupervisorSettings,
        binary: impl Into<PathBuf>,
        config_file: impl Into<PathBuf>,
    ) -> Result<Self, RelayError> {
        Self::new(
            config,
            settings,
            config_file,
            Arc::new(BinaryLauncher::new(binary)),
        )
    }

    /// Whether the relay binary exists and is executable.
    pub fn is_binary_available(&self) -> bool {
        self.inner.launcher.is_available()
    }

    pub fn binary_path(&self) -> &Path {
        self.inner.launcher.binary_path()
    }

    /// In-memory state check; does not probe the process.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn state(&self) -> RelayProcessState {
        *self.inner.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<RelayProcessState> {
        self.inner.state.subscribe()
    }

    /// Static configuration.
    pub fn get_config(&self) -> &RelayProcessConfig {
        &self.inner.config
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.inner.settings
    }

    /// Start the relay.
    ///
    /// Idempotent: returns `AlreadyRunning` without spawning if the relay is
    /// up. Concurrent callers queue on the lifecycle lock; the second one
    /// observes `Running` and spawns nothing.
    ///
    /// The work runs on its own task, so dropping the returned future (an
    /// HTTP client going away mid-request) never leaves the state in
    /// `Starting`.
    pub async fn start(&self) -> Result<StartOutcome, RelayError> {
        let this = self.clone();
        tokio::spawn(async move { this.run_start().await })
            .await
            .map_err(|e| RelayError::Internal(format!("relay start task failed: {e}")))?
    }

    /// Stop the relay.
    ///
    /// A no-op returning `NotRunning` unless the state is `Running`. A
    /// process left over from a failed cycle is still reaped, but the state
    /// stays `Failed`. Like `start()`, the work survives the caller being
    /// dropped.
    pub async fn stop(&self) -> Result<StopOutcome, RelayError> {
        let this = self.clone();
        tokio::spawn(async move { this.run_stop().await })
            .await
            .map_err(|e| RelayError::Internal(format!("relay stop task failed: {e}")))?
    }

    async fn run_start(&self) -> Result<StartOutcome, RelayError> {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;

        if self.is_running() {
            let alive = lifecycle
                .process
                .as_mut()
                .is_some_and(|process| process.try_exit().is_none());
            if alive {
                debug!("Relay already running");
                return Ok(StartOutcome::AlreadyRunning(inner.config.clone()));
            }
            // The monitor has not noticed yet
            inner.fail_if_running("relay process exited".to_string());
        }

        if !inner.launcher.is_available() {
            return Err(RelayError::Unavailable {
                path: inner.launcher.binary_path().to_path_buf(),
            });
        }

        // Anything left from a failed cycle must go before a new spawn
        if let Some(token) = lifecycle.monitor.take() {
            token.cancel();
        }
        if let Some(mut leftover) = lifecycle.process.take() {
            debug!(pid = ?leftover.pid(), "Reaping leftover relay process");
            if let Err(e) = leftover.terminate(inner.settings.stop_grace).await {
                warn!(error = %e, "Failed to reap leftover relay process");
            }
        }

        if !inner.transition(RelayProcessState::Starting, RelayEvent::starting()) {
            return Err(RelayError::Internal(format!(
                "cannot start relay from state {}",
                self.state()
            )));
        }
        info!(
            rtmp_port = inner.config.rtmp_port,
            webrtc_port = inner.config.webrtc_port,
            hls_port = inner.config.hls_port,
            api_port = inner.config.api_port,
            "Starting MediaMTX"
        );

        if let Err(e) = write_relay_config(&inner.config, &inner.config_file).await {
            inner.fail(e.to_string());
            return Err(e);
        }

        let mut process = match inner
            .launcher
            .launch(&inner.config_file, inner.logs.clone())
            .await
        {
            Ok(process) => process,
            Err(e) => {
                inner.fail(e.to_string());
                return Err(e);
            }
        };

        let ready = wait_for_relay_ready(
            &inner.api,
            process.as_mut(),
            inner.settings.readiness_timeout,
            inner.settings.probe_interval,
        )
        .await;

        match ready {
            Ok(()) => {}
            Err(ReadinessError::Exited(status)) => {
                let err = RelayError::SpawnFailed(format!("process exited during startup ({status})"));
                inner.fail(err.to_string());
                return Err(err);
            }
            Err(ReadinessError::TimedOut { last_error }) => {
                debug!(%last_error, "Readiness probe gave up");
                if let Err(e) = process.terminate(inner.settings.stop_grace).await {
                    warn!(error = %e, "Failed to terminate unready relay process");
                }
                let err = RelayError::HealthTimeout {
                    timeout_secs: inner.settings.readiness_timeout.as_secs(),
                    port: inner.config.api_port,
                };
                inner.fail(err.to_string());
                return Err(err);
            }
        }

        let pid = process.pid();
        if !inner.transition(RelayProcessState::Running, RelayEvent::running(pid)) {
            if let Err(e) = process.terminate(inner.settings.stop_grace).await {
                warn!(error = %e, "Failed to terminate relay process");
            }
            return Err(RelayError::Internal(format!(
                "relay left starting state early ({})",
                self.state()
            )));
        }
        let token = CancellationToken::new();
        lifecycle.process = Some(process);
        lifecycle.monitor = Some(token.clone());
        self.spawn_monitor(pid, token);

        info!(?pid, "MediaMTX is running");
        Ok(StartOutcome::Started(inner.config.clone()))
    }

    async fn run_stop(&self) -> Result<StopOutcome, RelayError> {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;

        if let Some(token) = lifecycle.monitor.take() {
            token.cancel();
        }

        if !self.is_running() {
            if let Some(mut leftover) = lifecycle.process.take() {
                debug!(pid = ?leftover.pid(), "Reaping relay process outside running state");
                if let Err(e) = leftover.terminate(inner.settings.stop_grace).await {
                    warn!(error = %e, "Failed to reap relay process");
                }
            }
            debug!(state = %self.state(), "Relay not running, nothing to stop");
            return Ok(StopOutcome::NotRunning);
        }

        if !inner.transition(RelayProcessState::Stopping, RelayEvent::stopping()) {
            return Err(RelayError::Internal(format!(
                "cannot stop relay from state {}",
                self.state()
            )));
        }
        info!("Stopping MediaMTX");

        if let Some(mut process) = lifecycle.process.take() {
            if let Err(e) = process.terminate(inner.settings.stop_grace).await {
                let err = RelayError::StopFailed(e.to_string());
                inner.fail(err.to_string());
                return Err(err);
            }
        }

        inner.transition(RelayProcessState::Stopped, RelayEvent::stopped());
        info!("MediaMTX stopped");
        Ok(StopOutcome::Stopped)
    }

    /// Combined supervisor and relay status.
    ///
    /// Stream activity comes from the control API; a failed call while
    /// running reports `streamActive: false` with `streamState: unknown`.
    pub async fn status(&self) -> RelayStatus {
        let state = self.state();
        let live = if state.is_running() {
            match self.inner.api.list_paths().await {
                Ok(paths) => Some(paths.any_live()),
                Err(e) => {
                    debug!(error = %e, "Could not read stream activity");
                    None
                }
            }
        } else {
            None
        };

        RelayStatus::compose(&self.inner.config, self.is_binary_available(), state, live)
    }

    /// Publish paths reported by the relay, or `None` if its control API is
    /// unreachable. Callers must check `is_running()` first.
    pub async fn get_active_paths(&self) -> Option<PathList> {
        match self.inner.api.list_paths().await {
            Ok(paths) => Some(paths),
            Err(e) => {
                warn!(error = %e, "MediaMTX control API unreachable");
                None
            }
        }
    }

    /// Recent relay output, oldest first.
    pub fn logs(&self) -> Vec<RelayLogEntry> {
        self.inner.logs.entries()
    }

    pub fn clear_logs(&self) {
        self.inner.logs.clear();
    }

    /// Subscribe to lifecycle and log events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.inner.events.subscribe()
    }

    /// Stop the relay if running. Used on process exit.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(StopOutcome::Stopped) => info!("Relay stopped during shutdown"),
            Ok(StopOutcome::NotRunning) => {}
            Err(e) => error!(error = %e, "Failed to stop relay during shutdown"),
        }
    }

    fn spawn_monitor(&self, pid: Option<u32>, token: CancellationToken) {
        let monitor = RelayHealthMonitor::new(
            self.inner.api.clone(),
            pid,
            self.inner.settings.monitor_interval,
            token,
        );
        let threshold = self.inner.settings.failure_threshold;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let stream = monitor.monitor();
            futures_util::pin_mut!(stream);

            while let Some(health) = stream.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match health {
                    RelayHealth::Healthy => debug!("Relay healthy"),
                    RelayHealth::ProcessDied => {
                        inner.fail_if_running("relay process exited unexpectedly".to_string());
                        break;
                    }
                    RelayHealth::Unreachable {
                        consecutive_failures,
                        last_error,
                    } if consecutive_failures >= threshold => {
                        inner.fail_if_running(format!(
                            "control API unreachable after {consecutive_failures} checks: {last_error}"
                        ));
                        break;
                    }
                    RelayHealth::Unreachable {
                        consecutive_failures,
                        last_error,
                    } => {
                        warn!(consecutive_failures, %last_error, "Relay health check failed");
                    }
                }
            }
        });
    }
}
