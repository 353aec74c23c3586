//! Relay process supervision for stagehand.
//!
//! Owns the MediaMTX child process: binary resolution, configuration
//! rendering, spawning, readiness and health probing, graceful shutdown,
//! and the control-API queries behind the status endpoint.
#![deny(unsafe_code)]

pub mod api;
pub mod binary;
mod health;
pub mod monitor;
pub mod process;
pub mod relay_config;
mod supervisor;

pub use api::RelayApiClient;
pub use binary::{BINARY_ENV_VAR, BinaryError, resolve_relay_binary, validate_binary};
pub use health::{ReadinessError, check_process_alive, wait_for_relay_ready};
pub use monitor::{RelayHealth, RelayHealthMonitor};
pub use process::{
    BinaryLauncher, RelayEventBroadcaster, RelayLauncher, RelayLogBuffer, RelayProcess,
};
pub use relay_config::{render_relay_config, write_relay_config};
pub use supervisor::{RelaySupervisor, StartOutcome, StopOutcome, SupervisorSettings};
