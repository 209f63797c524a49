//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// liftlog - record and analyse lifting sets from a wearable IMU
#[derive(Parser, Debug)]
#[command(
    name = "liftlog",
    author,
    version,
    about = "Wearable IMU telemetry recorder and set analyser",
    long_about = "Records motion telemetry from a wearable IMU into a durable CSV log,\n\
                  then segments the log into reps and estimates the 2D bar path.\n\n\
                  Options may also be given as LIFTLOG_* environment variables or in a .env file."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIFTLOG_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LIFTLOG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Expose Prometheus metrics on this port
    #[arg(long, global = true, env = "LIFTLOG_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default level when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the device and record a set into the durable log
    Record(RecordArgs),

    /// Segment a recorded log into reps
    Reps(RepsArgs),

    /// Estimate the 2D bar path of a recorded log
    Trajectory(TrajectoryArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `record` command
#[derive(Parser, Debug, Clone)]
pub struct RecordArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "LIFTLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the device address
    #[arg(long, env = "LIFTLOG_ADDRESS")]
    pub address: Option<String>,

    /// Override the durable log path
    #[arg(long, env = "LIFTLOG_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Stop after this many seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "LIFTLOG_DURATION")]
    pub duration: f64,

    /// Stop after this many samples (0 = unlimited)
    #[arg(long, default_value = "0", env = "LIFTLOG_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Reset the device sequence counter before starting
    #[arg(long)]
    pub reset_seq: bool,

    /// Notification rate of the simulated device (Hz)
    #[arg(long, default_value = "50", env = "LIFTLOG_SIM_RATE_HZ")]
    pub sim_rate_hz: f64,
}

/// Arguments for the `reps` command
#[derive(Parser, Debug, Clone)]
pub struct RepsArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "LIFTLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sample log to analyse (default: recording.log_path)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Rep report destination (default: <analysis_dir>/ble_decoded_analysis.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enter a rep above this angular rate (deg/s)
    #[arg(long, env = "LIFTLOG_START_THRESHOLD")]
    pub start_threshold: Option<f64>,

    /// Leave a rep below this angular rate (deg/s)
    #[arg(long, env = "LIFTLOG_STOP_THRESHOLD")]
    pub stop_threshold: Option<f64>,

    /// Discard reps shorter than this (seconds)
    #[arg(long, env = "LIFTLOG_MIN_REP_DURATION")]
    pub min_rep_duration: Option<f64>,
}

/// Arguments for the `trajectory` command
#[derive(Parser, Debug, Clone)]
pub struct TrajectoryArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "LIFTLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sample log to analyse (default: recording.log_path)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Trajectory report destination (default: <analysis_dir>/ble_decoded_trajectory.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Warn when the log spans more than this (seconds)
    #[arg(long, env = "LIFTLOG_MAX_WINDOW_S")]
    pub max_window_s: Option<f64>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "liftlog.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the effective configuration with every default filled in
    #[arg(long)]
    pub print_config: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
