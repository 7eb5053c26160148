//! CLI arguments and subcommands for herakles-proc-monitor.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand};
use herakles_proc_monitor::config::{ConfigFormat, LogLevel, OutputFormat};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuilt: ",
    env!("VERGEN_BUILD_TIMESTAMP")
);

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-monitor",
    about = "Point-in-time Linux system and per-process monitor",
    long_about = "Point-in-time Linux system and per-process monitor.\n\n\
                  Samples /proc to report CPU and memory utilization, uptime and \
                  per-process owner, command, resident memory, age and CPU share.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version,
    long_version = LONG_VERSION,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides config)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Delay between the two CPU counter reads in milliseconds
    #[arg(long)]
    pub sample_interval_ms: Option<u64>,

    /// Maximum number of processes to capture per refresh
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Read a generated fixture tree instead of the live system (testing)
    #[arg(long, hide = true)]
    pub fixture_root: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take one or more snapshots and print them (default)
    Snapshot {
        /// Number of refresh cycles
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Processes to show in text output (0 = all)
        #[arg(long)]
        top: Option<usize>,

        /// Output format (overrides config)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Validate configuration and system requirements
    Check {
        /// Check the process namespace and per-process files
        #[arg(long)]
        proc: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments (YAML only)
        #[arg(long)]
        commented: bool,
    },

    /// Generate a synthetic proc/etc tree for testing
    GenerateFixture {
        /// Output directory
        #[arg(short = 'o', long, default_value = "fixture")]
        output: PathBuf,

        /// Number of processes to generate
        #[arg(long, default_value_t = 50)]
        processes: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}
