//! Relay health monitoring primitives.
//!
//! The monitor is policy-free: it checks process liveness and the control
//! API on an interval and yields status changes. Deciding when a relay has
//! crashed is up to the supervisor.

use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::RelayApiClient;
use crate::health::check_process_alive;

/// Result of one monitoring round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayHealth {
    Healthy,
    /// The control API did not answer `consecutive_failures` rounds in a row.
    Unreachable {
        consecutive_failures: u32,
        last_error: String,
    },
    /// The relay process is gone.
    ProcessDied,
}

/// Continuous health monitor for one relay process.
pub struct RelayHealthMonitor {
    api: RelayApiClient,
    pid: Option<u32>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl RelayHealthMonitor {
    /// Create a monitor. Without a `pid` only the control API is checked.
    pub fn new(
        api: RelayApiClient,
        pid: Option<u32>,
        check_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            api,
            pid,
            interval: check_interval,
            cancel_token,
        }
    }

    /// Start monitoring.
    ///
    /// Yields when the status changes; every failed round while unreachable
    /// counts as a change. Ends on cancellation or once the process died.
    pub fn monitor(self) -> impl Stream<Item = RelayHealth> {
        let Self {
            api,
            pid,
            interval: check_interval,
            cancel_token,
        } = self;

        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Readiness was just confirmed
            ticker.tick().await;

            let mut last_status = RelayHealth::Healthy;
            let mut failures = 0u32;

            debug!(?pid, "Starting relay health monitor");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if pid.is_some_and(|pid| !check_process_alive(pid)) {
                            debug!(?pid, "Relay process is gone");
                            yield RelayHealth::ProcessDied;
                            break;
                        }

                        let current_status = match api.probe().await {
                            Ok(()) => {
                                failures = 0;
                                RelayHealth::Healthy
                            }
                            Err(e) => {
                                failures += 1;
                                RelayHealth::Unreachable {
                                    consecutive_failures: failures,
                                    last_error: e.to_string(),
                                }
                            }
                        };

                        if current_status != last_status {
                            debug!(?current_status, ?last_status, "Relay health changed");
                            yield current_status.clone();
                            last_status = current_status;
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        debug!(?pid, "Relay health monitor cancelled");
                        break;
                    }
                }
            }
        }
    }
}
