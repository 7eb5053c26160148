//! One refresh cycle over the whole machine.
//!
//! Every call to [`SystemMonitor::refresh`] is an independent pass: the
//! account table, the CPU sample and all process metrics are read afresh
//! and nothing is carried over to the next cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::process::{sort_by_cpu, ProcessMetrics};
use crate::sampler::CpuSampler;
use crate::source::StatSource;
use crate::system::SystemSummary;
use crate::users::UserTable;

/// Result of one refresh: system figures plus processes sorted by CPU.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub system: SystemSummary,
    pub processes: Vec<ProcessMetrics>,
}

impl Snapshot {
    /// The `n` busiest processes; all of them when `n` is 0.
    pub fn top(&self, n: usize) -> &[ProcessMetrics] {
        if n == 0 {
            &self.processes
        } else {
            &self.processes[..n.min(self.processes.len())]
        }
    }
}

/// Reads a [`Snapshot`] from a [`StatSource`].
#[derive(Debug, Clone)]
pub struct SystemMonitor {
    source: StatSource,
    sampler: CpuSampler,
    max_processes: Option<usize>,
}

impl SystemMonitor {
    pub fn new(source: StatSource, sample_interval: Duration) -> Self {
        let sampler = CpuSampler::new(source.clone(), sample_interval);
        Self {
            source,
            sampler,
            max_processes: None,
        }
    }

    /// Caps the number of processes captured per refresh.
    ///
    /// The cap is applied to the pid list in ascending enumeration order,
    /// before the CPU sort. With a cap set, busy processes with high pids
    /// can be left out of the snapshot entirely.
    pub fn with_max_processes(mut self, max: Option<usize>) -> Self {
        self.max_processes = max;
        self
    }

    pub fn source(&self) -> &StatSource {
        &self.source
    }

    #[instrument(skip(self))]
    pub fn refresh(&self) -> Snapshot {
        let start = Instant::now();

        let users = UserTable::load(&self.source);
        debug!("Loaded {} accounts", users.len());

        let cpu = self.sampler.sample();
        let system = SystemSummary::collect(&self.source, cpu);

        let mut pids = self.source.pids();
        if let Some(max) = self.max_processes {
            pids.truncate(max);
        }

        let mut processes: Vec<ProcessMetrics> = pids
            .into_iter()
            .map(|pid| ProcessMetrics::capture(&self.source, &users, pid, system.uptime_seconds))
            .collect();
        sort_by_cpu(&mut processes);

        info!(
            "Refresh captured {} processes in {:.2}ms",
            processes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Snapshot {
            captured_at: Utc::now(),
            system,
            processes,
        }
    }
}
