//! Per-process metrics captured from `/proc/<pid>/{status,cmdline,stat}`.
//!
//! A [`ProcessMetrics`] is built once per pid per refresh and never mutated.
//! A process that exits between enumeration and capture simply yields
//! default values.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::error::{Result, StatError};
use crate::format;
use crate::source::{is_numeric_string, StatSource};
use crate::users::UserTable;

/// Fields in `/proc/<pid>/stat` up to and including `starttime`.
pub const STAT_MIN_FIELDS: usize = 22;

const UTIME: usize = 13;
const STIME: usize = 14;
const CUTIME: usize = 15;
const CSTIME: usize = 16;
const STARTTIME: usize = 21;

/// Whitespace-split view of one `/proc/<pid>/stat` line.
///
/// The second field (`comm`) is the executable name in parentheses and may
/// itself contain spaces or parentheses, so it is cut at the last `)` before
/// the remaining fields are split.
#[derive(Debug, Clone)]
pub struct StatLine<'a> {
    fields: Vec<&'a str>,
}

impl<'a> StatLine<'a> {
    pub fn split(line: &'a str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(StatError::Empty);
        }

        let fields = match (line.find('('), line.rfind(')')) {
            (Some(open), Some(close)) if open < close => {
                let mut fields = vec![line[..open].trim(), &line[open + 1..close]];
                fields.extend(line[close + 1..].split_whitespace());
                fields
            }
            _ => line.split_whitespace().collect(),
        };
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Executable name without the surrounding parentheses.
    pub fn comm(&self) -> Option<&'a str> {
        self.fields.get(1).copied()
    }

    fn numeric(&self, index: usize, name: &'static str) -> Result<u64> {
        let value = self.fields.get(index).ok_or(StatError::TooFewFields {
            expected: index + 1,
            found: self.fields.len(),
        })?;
        if !is_numeric_string(value) {
            return Err(StatError::InvalidField {
                name,
                value: value.to_string(),
            });
        }
        value.parse().map_err(|_| StatError::InvalidField {
            name,
            value: value.to_string(),
        })
    }

    /// Start time in clock ticks after boot.
    pub fn start_time(&self) -> Result<u64> {
        self.numeric(STARTTIME, "starttime")
    }

    /// utime + stime + cutime + cstime, in clock ticks.
    pub fn cpu_ticks(&self) -> Result<u64> {
        Ok(self.numeric(UTIME, "utime")?
            + self.numeric(STIME, "stime")?
            + self.numeric(CUTIME, "cutime")?
            + self.numeric(CSTIME, "cstime")?)
    }
}

/// Decoded timing fields of `/proc/<pid>/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStat {
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
    pub start_time: u64,
}

impl ProcStat {
    /// Decodes a full stat line, failing when it is shorter than
    /// [`STAT_MIN_FIELDS`] or any timing field is not a number.
    pub fn parse(line: &str) -> Result<Self> {
        let stat = StatLine::split(line)?;
        if stat.len() < STAT_MIN_FIELDS {
            return Err(StatError::TooFewFields {
                expected: STAT_MIN_FIELDS,
                found: stat.len(),
            });
        }
        Ok(Self {
            utime: stat.numeric(UTIME, "utime")?,
            stime: stat.numeric(STIME, "stime")?,
            cutime: stat.numeric(CUTIME, "cutime")?,
            cstime: stat.numeric(CSTIME, "cstime")?,
            start_time: stat.start_time()?,
        })
    }

    pub fn cpu_ticks(&self) -> u64 {
        self.utime + self.stime + self.cutime + self.cstime
    }
}

/// Seconds the process has been alive, given the system uptime.
/// Zero when the start time is unreadable or lies in the future.
pub fn process_age(stat: &StatLine<'_>, system_uptime: u64, ticks_per_second: u64) -> u64 {
    match stat.start_time() {
        Ok(start_ticks) => {
            let start_secs = start_ticks as f64 / ticks_per_second.max(1) as f64;
            (system_uptime as f64 - start_secs).max(0.0) as u64
        }
        Err(e) => {
            debug!("Process age unavailable: {}", e);
            0
        }
    }
}

/// Average CPU share over the lifetime of the process, in `[0, 1]`.
/// `None` when the timing fields are unreadable or no time has elapsed.
pub fn lifetime_cpu_utilization(
    stat: &StatLine<'_>,
    system_uptime: u64,
    ticks_per_second: u64,
) -> Option<f64> {
    let tps = ticks_per_second.max(1) as f64;
    let (cpu_ticks, start_ticks) = match (stat.cpu_ticks(), stat.start_time()) {
        (Ok(cpu), Ok(start)) => (cpu, start),
        (Err(e), _) | (_, Err(e)) => {
            debug!("Process cpu utilization unavailable: {}", e);
            return None;
        }
    };

    let elapsed = system_uptime as f64 - start_ticks as f64 / tps;
    if elapsed <= 0.0 {
        return None;
    }
    Some((cpu_ticks as f64 / tps / elapsed).clamp(0.0, 1.0))
}

/// Replaces the NUL argument separators of a command line with spaces.
/// Only trailing NULs are dropped; whitespace inside an argument is kept.
pub fn normalize_command(raw: &str) -> String {
    raw.trim_end_matches('\0').replace('\0', " ")
}

/// Immutable per-process metric bundle for one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessMetrics {
    pub pid: u32,
    pub user: String,
    pub command: String,
    /// Resident memory in MB, two decimals.
    pub ram: String,
    pub ram_kb: u64,
    pub uptime_seconds: u64,
    pub cpu_utilization: Option<f64>,
}

impl ProcessMetrics {
    /// Reads every metric of `pid`. `system_uptime` is the machine uptime in
    /// whole seconds, read once per refresh by the caller.
    pub fn capture(source: &StatSource, users: &UserTable, pid: u32, system_uptime: u64) -> Self {
        let keys = source.keys();
        let status = source.pid_file(pid, "status");

        let uid: Option<u32> = source
            .read_keyed_value::<String>(keys.uid, &status)
            .parse()
            .ok();
        let ram_kb: u64 = source.read_keyed_value(keys.resident_memory, &status);
        let command = normalize_command(&source.read_first_line(&source.pid_file(pid, "cmdline")));

        let stat_line = source.read_first_line(&source.pid_file(pid, "stat"));
        let ticks = source.ticks_per_second();
        let (uptime_seconds, cpu_utilization) = match StatLine::split(&stat_line) {
            Ok(stat) => (
                process_age(&stat, system_uptime, ticks),
                lifetime_cpu_utilization(&stat, system_uptime, ticks),
            ),
            Err(e) => {
                debug!("pid {}: {}", pid, e);
                (0, None)
            }
        };

        Self {
            pid,
            user: users.display_name(uid),
            command,
            ram: format::megabytes(ram_kb),
            ram_kb,
            uptime_seconds,
            cpu_utilization,
        }
    }

    /// CPU share used for ordering; unavailable counts as idle.
    pub fn cpu_sort_key(&self) -> f64 {
        self.cpu_utilization.unwrap_or(0.0)
    }
}

/// Orders processes by CPU utilization, highest first.
pub fn cpu_descending(a: &ProcessMetrics, b: &ProcessMetrics) -> Ordering {
    b.cpu_sort_key().total_cmp(&a.cpu_sort_key())
}

/// Stable sort by CPU utilization, highest first.
pub fn sort_by_cpu(processes: &mut [ProcessMetrics]) {
    processes.sort_by(cpu_descending);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLayout;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    // utime=400 stime=100 cutime=0 cstime=0 starttime=5000
    const STAT: &str = "1234 (my proc) S 1 1234 1234 0 -1 4194560 500 0 0 0 \
                        400 100 0 0 20 0 1 0 5000 10000000 500 18446744073709551615";

    fn write_process(root: &Path, pid: u32, status: &str, cmdline: &[u8], stat: &str) {
        let dir = root.join("proc").join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        fs::write(dir.join("cmdline"), cmdline).unwrap();
        fs::write(dir.join("stat"), stat).unwrap();
    }

    fn metrics(pid: u32, cpu: Option<f64>) -> ProcessMetrics {
        ProcessMetrics {
            pid,
            cpu_utilization: cpu,
            ..ProcessMetrics::default()
        }
    }

    #[test]
    fn test_stat_line_handles_spaces_in_comm() {
        let stat = StatLine::split(STAT).unwrap();
        assert_eq!(stat.comm(), Some("my proc"));
        assert_eq!(stat.start_time(), Ok(5000));
        assert_eq!(stat.cpu_ticks(), Ok(500));
    }

    #[test]
    fn test_proc_stat_parse() {
        let stat = ProcStat::parse(STAT).unwrap();
        assert_eq!(stat.utime, 400);
        assert_eq!(stat.stime, 100);
        assert_eq!(stat.start_time, 5000);
        assert_eq!(stat.cpu_ticks(), 500);
    }

    #[test]
    fn test_proc_stat_too_few_fields() {
        let err = ProcStat::parse("1 (init) S 0 1 1").unwrap_err();
        assert_eq!(
            err,
            StatError::TooFewFields {
                expected: STAT_MIN_FIELDS,
                found: 6
            }
        );
        assert_eq!(ProcStat::parse("   ").unwrap_err(), StatError::Empty);
    }

    #[test]
    fn test_proc_stat_invalid_field() {
        let garbled = STAT.replace(" 400 ", " 4x0 ");
        let err = ProcStat::parse(&garbled).unwrap_err();
        assert!(matches!(err, StatError::InvalidField { name: "utime", .. }));
    }

    #[test]
    fn test_process_age() {
        let stat = StatLine::split(STAT).unwrap();
        // started 50s after boot, system up 1050s
        assert_eq!(process_age(&stat, 1050, 100), 1000);
        // clock skew: start after current uptime
        assert_eq!(process_age(&stat, 10, 100), 0);

        let short = StatLine::split("1 (x) S 0").unwrap();
        assert_eq!(process_age(&short, 1050, 100), 0);
    }

    #[test]
    fn test_lifetime_cpu_utilization() {
        let stat = StatLine::split(STAT).unwrap();
        // 5 cpu seconds over 1000 elapsed seconds
        let ratio = lifetime_cpu_utilization(&stat, 1050, 100).unwrap();
        assert!((ratio - 0.005).abs() < 1e-9);

        // zero elapsed time
        assert_eq!(lifetime_cpu_utilization(&stat, 50, 100), None);

        // more cpu time than wall time on a multi-core machine is clamped
        let busy = STAT.replace(" 400 100 ", " 400000 100000 ");
        let busy = StatLine::split(&busy).unwrap();
        assert_eq!(lifetime_cpu_utilization(&busy, 1050, 100), Some(1.0));
    }

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("/bin/sleep\u{0}100\u{0}"), "/bin/sleep 100");
        assert_eq!(normalize_command(""), "");
        assert_eq!(normalize_command("a\u{0}b \u{0}"), "a b ");
        assert_eq!(normalize_command("echo\u{0}\u{0}"), "echo");
    }

    #[test]
    fn test_capture_reads_all_metrics() {
        let dir = tempdir().unwrap();
        write_process(
            dir.path(),
            1234,
            "Name:\tmy proc\nUid:\t1000\t1000\t1000\t1000\nVmSize:\t  409600 kB\nVmRSS:\t  204800 kB\n",
            b"/usr/bin/my-proc\x00--flag\x00",
            STAT,
        );
        let source = StatSource::new(SourceLayout::rooted_at(dir.path()).with_ticks_per_second(100));
        let users = UserTable::parse("alice:x:1000:1000::/home/alice:/bin/sh\n");

        let m = ProcessMetrics::capture(&source, &users, 1234, 1050);
        assert_eq!(m.pid, 1234);
        assert_eq!(m.user, "alice");
        assert_eq!(m.command, "/usr/bin/my-proc --flag");
        assert_eq!(m.ram, "204.80");
        assert_eq!(m.ram_kb, 204800);
        assert_eq!(m.uptime_seconds, 1000);
        assert!((m.cpu_utilization.unwrap() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_capture_with_non_utf8_name() {
        let dir = tempdir().unwrap();
        write_process(dir.path(), 1234, "", b"w\xffrk\x00", STAT);
        fs::write(
            dir.path().join("proc").join("1234").join("status"),
            b"Name:\tw\xffrk\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t  204800 kB\n",
        )
        .unwrap();
        let source = StatSource::new(SourceLayout::rooted_at(dir.path()).with_ticks_per_second(100));
        let users = UserTable::parse("alice:x:1000:1000::/home/alice:/bin/sh\n");

        let m = ProcessMetrics::capture(&source, &users, 1234, 1050);
        assert_eq!(m.user, "alice");
        assert_eq!(m.ram, "204.80");
        assert_eq!(m.command, "w\u{fffd}rk");
    }

    #[test]
    fn test_capture_vanished_process_degrades() {
        let dir = tempdir().unwrap();
        let source = StatSource::new(SourceLayout::rooted_at(dir.path()));

        let m = ProcessMetrics::capture(&source, &UserTable::default(), 777, 1050);
        assert_eq!(m.pid, 777);
        assert_eq!(m.user, crate::users::UNKNOWN_USER);
        assert_eq!(m.command, "");
        assert_eq!(m.ram, "0.00");
        assert_eq!(m.uptime_seconds, 0);
        assert_eq!(m.cpu_utilization, None);
    }

    #[test]
    fn test_cpu_descending_order() {
        let busy = metrics(1, Some(0.9));
        let idle = metrics(2, Some(0.1));
        assert_eq!(cpu_descending(&busy, &idle), Ordering::Less);

        let mut all = vec![idle, metrics(3, None), busy, metrics(4, Some(0.5))];
        sort_by_cpu(&mut all);
        let pids: Vec<u32> = all.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 4, 2, 3]);
    }
}
