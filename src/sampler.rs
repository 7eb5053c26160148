//! System-wide CPU utilization from two `/proc/stat` readings.
//!
//! The aggregate `cpu` line holds cumulative tick counters. Utilization over
//! an interval is the share of non-idle ticks among all ticks that elapsed
//! between the two readings.

use std::thread;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::source::{is_numeric_string, StatSource};

/// Default delay between the two readings of a sample.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(30);

/// Characters to skip on the first `/proc/stat` line to drop the `cpu` label.
const CPU_LABEL_LEN: usize = 3;

/// Number of counters on the aggregate cpu line.
pub const CPU_COUNTER_FIELDS: usize = 10;

/// One reading of the aggregate CPU tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Builds a reading from the counter tokens following the `cpu` label.
    /// Each field is validated on its own; a missing or non-numeric token
    /// counts as zero.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let field = |i: usize| -> u64 {
            match tokens.get(i).map(|t| AsRef::<str>::as_ref(t)) {
                Some(t) if is_numeric_string(t) => t.parse().unwrap_or(0),
                Some(t) => {
                    debug!("Ignoring non-numeric cpu counter {} at index {}", t, i);
                    0
                }
                None => 0,
            }
        };

        Self {
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
            guest: field(8),
            guest_nice: field(9),
        }
    }

    /// Idle ticks: idle + iowait.
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy ticks: user + nice + system + irq + softirq + steal.
    /// Guest time is already accounted in user/nice.
    pub fn non_idle_total(&self) -> u64 {
        self.user + self.nice + self.system + self.irq + self.softirq + self.steal
    }

    pub fn total(&self) -> u64 {
        self.idle_total() + self.non_idle_total()
    }
}

/// Share of busy ticks between two readings, in `[0, 1]`.
///
/// Returns `None` when no ticks elapsed (or the counters went backwards),
/// in which case utilization is unavailable for this interval.
pub fn utilization(previous: &CpuTimes, current: &CpuTimes) -> Option<f64> {
    let total_delta = current.total().checked_sub(previous.total())?;
    if total_delta == 0 {
        return None;
    }
    let idle_delta = current.idle_total().saturating_sub(previous.idle_total());
    let busy_delta = total_delta.saturating_sub(idle_delta);

    Some((busy_delta as f64 / total_delta as f64).clamp(0.0, 1.0))
}

/// Samples aggregate CPU utilization by reading `/proc/stat` twice.
#[derive(Debug, Clone)]
pub struct CpuSampler {
    source: StatSource,
    interval: Duration,
}

impl CpuSampler {
    pub fn new(source: StatSource, interval: Duration) -> Self {
        Self { source, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reads the current aggregate counters.
    pub fn read(&self) -> CpuTimes {
        let tokens = self
            .source
            .read_token_sequence(&self.source.proc_file("stat"), CPU_LABEL_LEN);
        CpuTimes::from_tokens(&tokens[..tokens.len().min(CPU_COUNTER_FIELDS)])
    }

    /// Blocks for the sample interval between two readings and returns the
    /// utilization over that interval.
    #[instrument(skip_all)]
    pub fn sample(&self) -> Option<f64> {
        let first = self.read();
        thread::sleep(self.interval);
        let second = self.read();

        let ratio = utilization(&first, &second);
        if ratio.is_none() {
            debug!("No cpu ticks elapsed during sample, utilization unavailable");
        }
        ratio
    }
}
