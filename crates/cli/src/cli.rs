//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Beacon - buffered delivery of error reports
#[derive(Parser, Debug)]
#[command(
    name = "beacon",
    author,
    version,
    about = "Buffered error-report delivery",
    long_about = "Reports log events at trigger severities to a collector through a bounded,\n\
                  non-blocking queue.\n\n\
                  Loads a reporter configuration, installs the report hook, and drives it\n\
                  with events read from stdin or given on the command line."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BEACON_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BEACON_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report events through the configured sink
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "beacon.toml", env = "BEACON_CONFIG")]
    pub config: PathBuf,

    /// Override the access token from configuration
    #[arg(long, env = "BEACON_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Override the environment from configuration
    #[arg(long, env = "BEACON_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Override the sink queue capacity from configuration
    #[arg(long, env = "BEACON_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Report this message instead of reading lines from stdin
    #[arg(short, long)]
    pub message: Option<String>,

    /// How many times to report `--message`
    #[arg(long, default_value = "1", requires = "message")]
    pub count: u64,

    /// Level at which events are logged
    #[arg(long, value_enum, default_value = "error")]
    pub level: EventLevel,

    /// Load configuration and print a summary without reporting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BEACON_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "beacon.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "beacon.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Level of events emitted by `run`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
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
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
