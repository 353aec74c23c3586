//! Relay process lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the relay process.
///
/// One instance per supervisor. Allowed transitions:
///
/// ```text
/// Stopped ──start──▶ Starting ──ready──▶ Running ──stop──▶ Stopping ──▶ Stopped
///                       │                   │
///                       └──spawn/timeout──▶ Failed ◀──crash──┘
/// Stopping ──kill failed──▶ Failed
/// Failed ──start──▶ Starting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayProcessState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl RelayProcessState {
    /// Whether the process is up and serving.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether a transition is in progress.
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// Whether `next` is a legal successor of `self`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Stopped | Self::Failed, Self::Starting)
                | (Self::Starting, Self::Running | Self::Failed)
                | (Self::Running, Self::Stopping | Self::Failed)
                | (Self::Stopping, Self::Stopped | Self::Failed)
        )
    }
}

impl fmt::Display for RelayProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
