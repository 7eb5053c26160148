//! CLI command implementations for herakles-proc-monitor.
//!
//! This module provides implementations for all CLI subcommands:
//! - `snapshot`: Refresh and print system + process metrics
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `generate-fixture`: Synthetic proc tree generation

pub mod check;
pub mod config;
pub mod generate;
pub mod snapshot;

// Re-export command functions
pub use check::command_check;
pub use config::{command_config, show_config};
pub use generate::command_generate_fixture;
pub use snapshot::command_snapshot;
