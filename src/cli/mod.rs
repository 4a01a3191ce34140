//! CLI interface for poly-mirror
//!
//! Provides subcommands for:
//! - `run`: start the live mirroring engine
//! - `pause` / `resume`: operator circuit-breaker commands
//! - `cancel`: cancel one resting order
//! - `status`: per-strategy ledger snapshot and open orders
//! - `config`: show effective configuration

mod admin;
mod run;

pub use admin::{CancelArgs, PauseArgs, ResumeArgs, StatusArgs};
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poly-mirror")]
#[command(about = "Mirrors simulated strategies with real capital on Polymarket")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the live mirroring engine
    Run(RunArgs),
    /// Pause a strategy and move its cash into cooldown
    Pause(PauseArgs),
    /// Resume a paused strategy
    Resume(ResumeArgs),
    /// Cancel a resting order and release its unfilled reserve
    Cancel(CancelArgs),
    /// Show ledger state and open orders
    Status(StatusArgs),
    /// Show effective configuration
    Config,
}
