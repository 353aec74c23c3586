//! Relay process plumbing.
//!
//! - `RelayLauncher` / `RelayProcess` - spawning seam used by the supervisor
//! - `RelayEventBroadcaster` - lifecycle and log event fan-out
//! - `RelayLogBuffer` - captured relay output
//! - `shutdown_child` - SIGTERM, grace period, SIGKILL

mod broadcaster;
mod launcher;
mod logs;
pub mod shutdown;

pub use broadcaster::RelayEventBroadcaster;
pub use launcher::{BinaryLauncher, RelayLauncher, RelayProcess};
pub use logs::{RelayLogBuffer, spawn_stream_reader};
pub use shutdown::shutdown_child;
