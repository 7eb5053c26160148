//! Synthetic `/proc` + `/etc` trees for exercising the monitor without a
//! live kernel.
//!
//! A [`FixtureManifest`] describes the machine; [`write_fixture`] lays it out
//! below a root directory in the shape [`SourceLayout::rooted_at`] expects,
//! together with a `fixture.json` copy of the manifest.
//!
//! [`SourceLayout::rooted_at`]: crate::source::SourceLayout::rooted_at

use anyhow::Context;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const MANIFEST_FILE: &str = "fixture.json";
pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureUser {
    pub name: String,
    pub uid: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSystem {
    pub pretty_name: String,
    pub kernel: String,
    pub uptime_seconds: f64,
    /// user nice system idle iowait irq softirq steal guest guest_nice
    pub cpu: [u64; 10],
    pub mem_total_kb: u64,
    pub mem_free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub total_processes: u64,
    pub running_processes: u64,
    pub users: Vec<FixtureUser>,
}

impl Default for FixtureSystem {
    fn default() -> Self {
        Self {
            pretty_name: "Herakles Linux 1.0".to_string(),
            kernel: "6.1.0-fixture".to_string(),
            uptime_seconds: 10_000.0,
            cpu: [4000, 100, 2000, 90000, 500, 10, 40, 0, 0, 0],
            mem_total_kb: 16_000_000,
            mem_free_kb: 8_000_000,
            buffers_kb: 500_000,
            cached_kb: 2_000_000,
            total_processes: 1000,
            running_processes: 2,
            users: vec![
                FixtureUser {
                    name: "root".to_string(),
                    uid: 0,
                },
                FixtureUser {
                    name: "herakles".to_string(),
                    uid: 1000,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProcess {
    pub pid: u32,
    pub name: String,
    pub uid: u32,
    pub rss_kb: u64,
    pub args: Vec<String>,
    pub utime: u64,
    pub stime: u64,
    pub start_ticks: u64,
}

impl FixtureProcess {
    /// `/proc/<pid>/stat` line with utime/stime at fields 14/15 and
    /// starttime at field 22.
    pub fn stat_line(&self) -> String {
        format!(
            "{pid} ({name}) S 1 {pid} {pid} 0 -1 4194560 100 0 0 0 {utime} {stime} 0 0 20 0 1 0 {start} 10000000 {pages} 18446744073709551615\n",
            pid = self.pid,
            name = self.name,
            utime = self.utime,
            stime = self.stime,
            start = self.start_ticks,
            pages = self.rss_kb / 4,
        )
    }

    pub fn status(&self) -> String {
        format!(
            "Name:\t{name}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t1\n\
             Uid:\t{uid}\t{uid}\t{uid}\t{uid}\nGid:\t{uid}\t{uid}\t{uid}\t{uid}\n\
             VmSize:\t{vsz} kB\nVmRSS:\t{rss} kB\nThreads:\t1\n",
            name = self.name,
            pid = self.pid,
            uid = self.uid,
            vsz = self.rss_kb * 4,
            rss = self.rss_kb,
        )
    }

    /// NUL-separated, NUL-terminated argument list.
    pub fn cmdline(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for arg in &self.args {
            out.extend_from_slice(arg.as_bytes());
            out.push(0);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureManifest {
    pub version: String,
    pub generated_at: String,
    pub ticks_per_second: u64,
    pub system: FixtureSystem,
    pub processes: Vec<FixtureProcess>,
}

impl FixtureManifest {
    pub fn new(ticks_per_second: u64, system: FixtureSystem, processes: Vec<FixtureProcess>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ticks_per_second,
            system,
            processes,
        }
    }
}

/// Writes the manifest as a `proc/` + `etc/` tree below `root`.
pub fn write_fixture(root: &Path, manifest: &FixtureManifest) -> anyhow::Result<()> {
    let proc_dir = root.join("proc");
    let etc_dir = root.join("etc");
    fs::create_dir_all(&proc_dir)
        .with_context(|| format!("Failed to create {}", proc_dir.display()))?;
    fs::create_dir_all(&etc_dir)
        .with_context(|| format!("Failed to create {}", etc_dir.display()))?;

    let sys = &manifest.system;
    let counters: Vec<String> = sys.cpu.iter().map(u64::to_string).collect();
    fs::write(
        proc_dir.join("stat"),
        format!(
            "cpu  {}\ncpu0 {}\nintr 0\nctxt 0\nbtime 0\nprocesses {}\nprocs_running {}\nprocs_blocked 0\n",
            counters.join(" "),
            counters.join(" "),
            sys.total_processes,
            sys.running_processes
        ),
    )?;
    fs::write(
        proc_dir.join("meminfo"),
        format!(
            "MemTotal:       {} kB\nMemFree:        {} kB\nMemAvailable:   {} kB\nBuffers:        {} kB\nCached:         {} kB\nSwapCached:     0 kB\n",
            sys.mem_total_kb,
            sys.mem_free_kb,
            sys.mem_free_kb + sys.buffers_kb + sys.cached_kb,
            sys.buffers_kb,
            sys.cached_kb
        ),
    )?;
    fs::write(
        proc_dir.join("uptime"),
        format!("{:.2} {:.2}\n", sys.uptime_seconds, sys.uptime_seconds * 4.0),
    )?;
    fs::write(
        proc_dir.join("version"),
        format!("Linux version {} (fixture@herakles) (gcc) #1 SMP\n", sys.kernel),
    )?;

    fs::write(
        etc_dir.join("os-release"),
        format!("NAME=\"Herakles\"\nPRETTY_NAME=\"{}\"\nID=herakles\n", sys.pretty_name),
    )?;
    let passwd: String = sys
        .users
        .iter()
        .map(|u| format!("{0}:x:{1}:{1}::/home/{0}:/bin/sh\n", u.name, u.uid))
        .collect();
    fs::write(etc_dir.join("passwd"), passwd)?;

    for p in &manifest.processes {
        let dir = proc_dir.join(p.pid.to_string());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("stat"), p.stat_line())?;
        fs::write(dir.join("status"), p.status())?;
        fs::write(dir.join("cmdline"), p.cmdline())?;
    }

    fs::write(root.join(MANIFEST_FILE), serde_json::to_string_pretty(manifest)?)?;
    debug!(
        "Wrote fixture with {} processes to {}",
        manifest.processes.len(),
        root.display()
    );
    Ok(())
}

/// Loads the manifest written next to a fixture tree.
pub fn load_manifest(root: &Path) -> anyhow::Result<FixtureManifest> {
    let path = root.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fixture manifest {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture manifest {}", path.display()))
}

const NAMES: &[&str] = &[
    "systemd", "sshd", "postgres", "nginx", "bash", "node", "java", "python3", "redis-server",
    "containerd",
];

/// Builds a random but internally consistent machine: every process starts
/// after boot and never used more CPU time than it has been alive.
pub fn generate_manifest(
    rng: &mut impl Rng,
    process_count: usize,
    ticks_per_second: u64,
) -> FixtureManifest {
    let ticks_per_second = ticks_per_second.max(1);
    let mut system = FixtureSystem {
        uptime_seconds: rng.gen_range(3_600.0..1_000_000.0),
        ..FixtureSystem::default()
    };
    for counter in system.cpu.iter_mut().take(8) {
        *counter = rng.gen_range(0..10_000_000);
    }
    system.mem_total_kb = rng.gen_range(2_000_000..64_000_000);
    system.mem_free_kb = rng.gen_range(0..system.mem_total_kb / 2);
    system.buffers_kb = rng.gen_range(0..system.mem_total_kb / 8);
    system.cached_kb = rng.gen_range(0..system.mem_total_kb / 4);
    system.total_processes = process_count as u64 + rng.gen_range(0..100_000);
    system.running_processes = rng.gen_range(1..=process_count.max(1) as u64);

    let uptime_ticks = (system.uptime_seconds as u64) * ticks_per_second;
    let mut pid: u32 = 1;
    let processes = (0..process_count)
        .map(|i| {
            let name = NAMES[i % NAMES.len()].to_string();
            let start_ticks = rng.gen_range(0..uptime_ticks.max(1));
            let alive = uptime_ticks.saturating_sub(start_ticks);
            let cpu_ticks = rng.gen_range(0..=alive);
            let utime = cpu_ticks * 3 / 4;
            let uid = system.users[i % system.users.len()].uid;

            let p = FixtureProcess {
                pid,
                args: vec![format!("/usr/bin/{name}"), format!("--worker={i}")],
                name,
                uid,
                rss_kb: rng.gen_range(1_000..2_000_000),
                utime,
                stime: cpu_ticks - utime,
                start_ticks,
            };
            pid += rng.gen_range(1..50);
            p
        })
        .collect();

    FixtureManifest::new(ticks_per_second, system, processes)
}
