//! CLI parse: clap types for delayq. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// delayq - delayed, budget-gated transaction dispatcher
#[derive(Parser, Debug)]
#[command(name = "delayq")]
#[command(about = "Relay executable delay-queue transactions within a gas allowance")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides the user config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Perform one dispatcher invocation
    Run {
        /// Ledger time in unix seconds (default: system clock)
        #[arg(long)]
        now: Option<u64>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Invoke the dispatcher periodically until interrupted
    Watch {
        /// Seconds between invocations
        #[arg(long, default_value = "60")]
        every: u64,
        /// Stop after this many invocations
        #[arg(long)]
        max_runs: Option<u64>,
    },
    /// Show the persisted dispatch cursor
    Cursor {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate configuration and report every problem
    Validate,
}
