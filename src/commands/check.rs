//! Check command implementation.
//!
//! Validates that the process namespace and the status files the monitor
//! depends on are readable and parse as expected.

use herakles_proc_monitor::config::{validate_effective_config, Config};
use herakles_proc_monitor::process::ProcStat;
use herakles_proc_monitor::system::{self, MemoryInfo};
use herakles_proc_monitor::users::UserTable;
use herakles_proc_monitor::StatSource;

/// Validates system requirements and configuration
pub fn command_check(
    proc: bool,
    all: bool,
    source: &StatSource,
    config: &Config,
) -> anyhow::Result<()> {
    println!("🔍 Herakles Process Monitor - System Check");
    println!("==========================================");

    let mut all_ok = true;

    // Check process namespace
    if proc || all {
        let root = &source.layout().proc_root;
        println!("\n📁 Checking process namespace {}...", root.display());
        let pids = source.pids();
        if pids.is_empty() {
            println!("   ❌ Cannot read any process entries");
            all_ok = false;
        } else {
            println!("   ✅ Found {} process entries", pids.len());

            // Prefer our own pid on a live system, any listed pid otherwise
            let own = std::process::id();
            let pid = if pids.contains(&own) { own } else { pids[0] };
            let line = source.read_first_line(&source.pid_file(pid, "stat"));
            match ProcStat::parse(&line) {
                Ok(stat) => println!(
                    "   ✅ Stat decoding successful for PID {}: start={} ticks, cpu={} ticks",
                    pid,
                    stat.start_time,
                    stat.cpu_ticks()
                ),
                Err(e) => {
                    println!("   ❌ Stat decoding failed for PID {}: {}", pid, e);
                    all_ok = false;
                }
            }
        }
    }

    // Check system-wide files
    if all {
        println!("\n💾 Checking system files...");
        let mem = MemoryInfo::read(source);
        if mem.total_kb > 0 {
            println!("   ✅ meminfo readable: MemTotal={} kB", mem.total_kb);
        } else {
            println!("   ❌ meminfo missing or without MemTotal");
            all_ok = false;
        }

        let uptime = system::uptime_seconds(source);
        if uptime > 0 {
            println!("   ✅ uptime readable: {}s", uptime);
        } else {
            println!("   ❌ uptime missing or zero");
            all_ok = false;
        }

        let kernel = system::kernel(source);
        if kernel.is_empty() {
            println!("   ⚠️  Kernel version unavailable");
        } else {
            println!("   ✅ Kernel: {}", kernel);
        }

        let os = system::operating_system(source);
        if os.is_empty() {
            println!("   ⚠️  OS name unavailable");
        } else {
            println!("   ✅ OS: {}", os);
        }

        let users = UserTable::load(source);
        if users.is_empty() {
            println!("   ⚠️  Account database empty or unreadable, owners shown as uid");
        } else {
            println!("   ✅ {} accounts loaded", users.len());
        }

        println!("   ✅ Clock ticks per second: {}", source.ticks_per_second());
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
