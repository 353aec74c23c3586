//! Relay lifecycle events for real-time state synchronization.
//!
//! These events are emitted by the supervisor and consumed by the dashboard
//! to keep its view of the relay in sync without polling.

use serde::{Deserialize, Serialize};

use crate::state::RelayProcessState;

/// Current time as Unix milliseconds.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single line of relay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayLogEntry {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub line: String,
    /// `stdout` or `stderr`
    pub stream: String,
}

impl RelayLogEntry {
    pub fn new(line: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            line: line.into(),
            stream: stream.into(),
        }
    }
}

/// Relay lifecycle event payload.
///
/// Consumers should respect `at` ordering to handle out-of-order delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    /// Spawn is in progress.
    Starting { at: i64 },
    /// Control API answered the readiness probe.
    Running {
        at: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },
    /// Graceful termination has been requested.
    Stopping { at: i64 },
    /// Process has exited and been reaped.
    Stopped { at: i64 },
    /// Spawn failure, readiness timeout, or crash while running.
    Failed { at: i64, reason: String },
    /// A line of relay output.
    Log(RelayLogEntry),
}

impl RelayEvent {
    pub fn starting() -> Self {
        Self::Starting { at: now_ms() }
    }

    pub fn running(pid: Option<u32>) -> Self {
        Self::Running { at: now_ms(), pid }
    }

    pub fn stopping() -> Self {
        Self::Stopping { at: now_ms() }
    }

    pub fn stopped() -> Self {
        Self::Stopped { at: now_ms() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            at: now_ms(),
            reason: reason.into(),
        }
    }

    /// The lifecycle state this event announces, if any.
    pub const fn state(&self) -> Option<RelayProcessState> {
        match self {
            Self::Starting { .. } => Some(RelayProcessState::Starting),
            Self::Running { .. } => Some(RelayProcessState::Running),
            Self::Stopping { .. } => Some(RelayProcessState::Stopping),
            Self::Stopped { .. } => Some(RelayProcessState::Stopped),
            Self::Failed { .. } => Some(RelayProcessState::Failed),
            Self::Log(_) => None,
        }
    }
}
