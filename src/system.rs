//! System-wide figures: OS name, kernel, uptime, process counts, memory.
//!
//! All readers are best-effort: a missing or garbled file produces an empty
//! string, zero, or `None` for ratios.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::source::{read_to_string_lossy, StatSource};

/// Memory figures from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
}

impl MemoryInfo {
    pub fn read(source: &StatSource) -> Self {
        let path = source.proc_file("meminfo");
        let keys = source.keys();
        Self {
            total_kb: source.read_keyed_value(keys.mem_total, &path),
            free_kb: source.read_keyed_value(keys.mem_free, &path),
            buffers_kb: source.read_keyed_value(keys.buffers, &path),
            cached_kb: source.read_keyed_value(keys.cached, &path),
        }
    }

    /// Memory not free and not reclaimable as buffers or page cache.
    pub fn used_kb(&self) -> u64 {
        self.total_kb
            .saturating_sub(self.free_kb)
            .saturating_sub(self.buffers_kb)
            .saturating_sub(self.cached_kb)
    }

    /// Used share of total memory, `None` when the total is unknown.
    pub fn utilization(&self) -> Option<f64> {
        if self.total_kb == 0 {
            return None;
        }
        Some((self.used_kb() as f64 / self.total_kb as f64).clamp(0.0, 1.0))
    }
}

/// Human-readable OS name (`PRETTY_NAME` of os-release).
pub fn operating_system(source: &StatSource) -> String {
    let path = &source.layout().os_release;
    let Some(content) = read_to_string_lossy(path) else {
        return String::new();
    };
    parse_os_release(&content, source.keys().pretty_name)
}

fn parse_os_release(content: &str, key: &str) -> String {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .unwrap_or_default()
}

/// Kernel release: third token of `/proc/version`.
pub fn kernel(source: &StatSource) -> String {
    source
        .read_first_line(&source.proc_file("version"))
        .split_whitespace()
        .nth(2)
        .unwrap_or_default()
        .to_string()
}

/// Whole seconds since boot. The file holds a float, the fraction is dropped.
pub fn uptime_seconds(source: &StatSource) -> u64 {
    let secs: f64 = source.read_first_value(&source.proc_file("uptime"));
    if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    }
}

/// Processes forked since boot (`processes` in `/proc/stat`).
pub fn total_processes(source: &StatSource) -> u64 {
    source.read_keyed_value(source.keys().total_processes, &source.proc_file("stat"))
}

/// Processes currently runnable (`procs_running` in `/proc/stat`).
pub fn running_processes(source: &StatSource) -> u64 {
    source.read_keyed_value(source.keys().running_processes, &source.proc_file("stat"))
}

/// Scalar system-level figures for one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSummary {
    pub operating_system: String,
    pub kernel: String,
    pub uptime_seconds: u64,
    pub total_processes: u64,
    pub running_processes: u64,
    pub cpu_utilization: Option<f64>,
    pub memory_utilization: Option<f64>,
    pub memory: MemoryInfo,
}

impl SystemSummary {
    /// Reads every system-wide figure. CPU utilization comes from a separate
    /// sampler because it needs two readings.
    #[instrument(skip_all)]
    pub fn collect(source: &StatSource, cpu_utilization: Option<f64>) -> Self {
        let memory = MemoryInfo::read(source);
        let summary = Self {
            operating_system: operating_system(source),
            kernel: kernel(source),
            uptime_seconds: uptime_seconds(source),
            total_processes: total_processes(source),
            running_processes: running_processes(source),
            cpu_utilization,
            memory_utilization: memory.utilization(),
            memory,
        };
        debug!(
            "System summary: uptime={}s total_procs={} running={}",
            summary.uptime_seconds, summary.total_processes, summary.running_processes
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLayout;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn fixture(root: &Path) -> StatSource {
        let proc_dir = root.join("proc");
        let etc = root.join("etc");
        fs::create_dir_all(&proc_dir).unwrap();
        fs::create_dir_all(&etc).unwrap();

        fs::write(
            etc.join("os-release"),
            "NAME=\"Debian GNU/Linux\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n",
        )
        .unwrap();
        fs::write(
            proc_dir.join("version"),
            "Linux version 6.1.0-18-amd64 (debian-kernel@lists.debian.org) (gcc-12) #1 SMP\n",
        )
        .unwrap();
        fs::write(
            proc_dir.join("meminfo"),
            "MemTotal:       1000000 kB\nMemFree:         400000 kB\nMemAvailable:    700000 kB\n\
             Buffers:          50000 kB\nCached:          150000 kB\nSwapCached:        1000 kB\n",
        )
        .unwrap();
        fs::write(proc_dir.join("uptime"), "35612.98 140021.11\n").unwrap();
        fs::write(
            proc_dir.join("stat"),
            "cpu  100 0 50 200 10 0 0 0 0 0\nintr 123 0 0\nctxt 999\nbtime 1700000000\n\
             processes 48211\nprocs_running 3\nprocs_blocked 0\n",
        )
        .unwrap();

        StatSource::new(SourceLayout::rooted_at(root))
    }

    #[test]
    fn test_system_figures() {
        let dir = tempdir().unwrap();
        let source = fixture(dir.path());

        assert_eq!(operating_system(&source), "Debian GNU/Linux 12 (bookworm)");
        assert_eq!(kernel(&source), "6.1.0-18-amd64");
        assert_eq!(uptime_seconds(&source), 35612);
        assert_eq!(total_processes(&source), 48211);
        assert_eq!(running_processes(&source), 3);
    }

    #[test]
    fn test_memory_utilization() {
        let dir = tempdir().unwrap();
        let source = fixture(dir.path());

        let mem = MemoryInfo::read(&source);
        assert_eq!(mem.total_kb, 1_000_000);
        assert_eq!(mem.cached_kb, 150_000);
        assert_eq!(mem.used_kb(), 400_000);
        assert!((mem.utilization().unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_memory_utilization_without_total() {
        let mem = MemoryInfo {
            total_kb: 0,
            free_kb: 10,
            ..MemoryInfo::default()
        };
        assert_eq!(mem.utilization(), None);
    }

    #[test]
    fn test_missing_files_degrade_to_defaults() {
        let dir = tempdir().unwrap();
        let source = StatSource::new(SourceLayout::rooted_at(dir.path()));

        let summary = SystemSummary::collect(&source, None);
        assert_eq!(summary.operating_system, "");
        assert_eq!(summary.kernel, "");
        assert_eq!(summary.uptime_seconds, 0);
        assert_eq!(summary.total_processes, 0);
        assert_eq!(summary.memory_utilization, None);
    }

    #[test]
    fn test_os_release_with_invalid_utf8() {
        let dir = tempdir().unwrap();
        let source = fixture(dir.path());
        fs::write(
            dir.path().join("etc").join("os-release"),
            b"NAME=\"Caf\xe9 OS\"\nPRETTY_NAME=\"Cafe OS 2\"\n",
        )
        .unwrap();

        assert_eq!(operating_system(&source), "Cafe OS 2");
    }

    #[test]
    fn test_parse_os_release_unquoted() {
        assert_eq!(parse_os_release("PRETTY_NAME=Alpine\n", "PRETTY_NAME"), "Alpine");
        assert_eq!(parse_os_release("NAME=x\n", "PRETTY_NAME"), "");
    }
}
