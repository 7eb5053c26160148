//! Point-in-time Linux system monitor.
//!
//! Reads `/proc` and the account database to derive system CPU and memory
//! utilization, uptime and per-process metrics. The file layout is injected
//! through [`source::SourceLayout`] so the whole pipeline can run against a
//! fixture directory.

pub mod config;
pub mod error;
pub mod fixture;
pub mod format;
pub mod monitor;
pub mod process;
pub mod sampler;
pub mod source;
pub mod system;
pub mod users;

pub use monitor::{Snapshot, SystemMonitor};
pub use process::ProcessMetrics;
pub use source::{SourceLayout, StatSource};
