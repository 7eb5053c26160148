//! Snapshot command implementation.
//!
//! Runs refresh cycles and prints each snapshot as a text table, JSON or YAML.

use herakles_proc_monitor::config::OutputFormat;
use herakles_proc_monitor::format::{elapsed_time, percent};
use herakles_proc_monitor::{Snapshot, SystemMonitor};
use std::fmt::Write as FmtWrite;
use tracing::debug;

/// Width of the command column before it is cut.
const COMMAND_WIDTH: usize = 60;

pub fn command_snapshot(
    monitor: &SystemMonitor,
    iterations: usize,
    top: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    for iteration in 1..=iterations.max(1) {
        debug!("Refresh {}/{}", iteration, iterations);
        let snapshot = monitor.refresh();

        let rendered = match format {
            OutputFormat::Text => render_text(&snapshot, top),
            OutputFormat::Json => serde_json::to_string_pretty(&snapshot)? + "\n",
            OutputFormat::Yaml => serde_yaml::to_string(&snapshot)?,
        };
        print!("{}", rendered);
    }
    Ok(())
}

/// Renders the system summary followed by the `top` busiest processes.
pub fn render_text(snapshot: &Snapshot, top: usize) -> String {
    let sys = &snapshot.system;
    let mut out = String::new();

    writeln!(out, "OS:        {}", sys.operating_system).ok();
    writeln!(out, "Kernel:    {}", sys.kernel).ok();
    writeln!(out, "CPU:       {}", percent(sys.cpu_utilization)).ok();
    writeln!(out, "Memory:    {}", percent(sys.memory_utilization)).ok();
    writeln!(
        out,
        "Processes: {} total, {} running",
        sys.total_processes, sys.running_processes
    )
    .ok();
    writeln!(out, "Up Time:   {}", elapsed_time(sys.uptime_seconds)).ok();
    writeln!(out).ok();

    writeln!(
        out,
        "{:>7} {:<12} {:>6} {:>10} {:>10}  {}",
        "PID", "USER", "CPU%", "RAM[MB]", "TIME+", "COMMAND"
    )
    .ok();
    writeln!(out, "{}", "-".repeat(60)).ok();

    for p in snapshot.top(top) {
        let cpu = match p.cpu_utilization {
            Some(r) => format!("{:.1}", r * 100.0),
            None => "n/a".to_string(),
        };
        let command: String = p.command.chars().take(COMMAND_WIDTH).collect();
        writeln!(
            out,
            "{:>7} {:<12} {:>6} {:>10} {:>10}  {}",
            p.pid,
            p.user,
            cpu,
            p.ram,
            elapsed_time(p.uptime_seconds),
            command
        )
        .ok();
    }
    out
}
