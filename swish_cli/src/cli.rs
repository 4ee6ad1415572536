//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "swish", version, about = "Wearable free-throw form trainer")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/swish.toml")]
    pub config: PathBuf,

    /// Replay a recorded motion trace CSV instead of the simulated IMU
    #[arg(long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    /// Seed for the simulated IMU
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u32>,

    /// Pace the control loop on the wall clock instead of virtual time
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,

    /// Append shots, baselines and summaries as JSON lines to this file
    #[arg(long = "shot-log", value_name = "FILE")]
    pub shot_log: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides RUST_LOG and the config
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record ten shots and derive a personal baseline
    Calibrate {
        /// Write the baseline snapshot here (printed to stdout when omitted)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Score shots against a baseline and answer with haptic cues
    Train {
        /// Baseline snapshot produced by `calibrate`; falls back to [baseline] in the config
        #[arg(long, value_name = "FILE")]
        baseline: Option<PathBuf>,
        /// Stop after this many shots
        #[arg(long, value_name = "N")]
        shots: Option<u64>,
    },
    /// Pulse every motor and push one simulated shot through the pipeline
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
