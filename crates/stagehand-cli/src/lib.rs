//! Command-line front end for stagehand.
//!
//! `serve` runs the HTTP surface around the relay supervisor, `probe`
//! drives one headless playback session against a relay, and
//! `relay status` prints what the local relay reports.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by main.rs binary
use dotenvy as _;
use tracing_subscriber as _;

pub mod commands;
pub mod handlers;
pub mod parser;

pub use commands::{Commands, ProbeArgs, RelayArgs, RelayCommand, ServeArgs};
pub use parser::Cli;
