//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Supervise a MediaMTX relay and probe its playback paths.
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Supervise a MediaMTX relay and probe its playback paths")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
