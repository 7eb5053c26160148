//! Generate fixture command implementation.
//!
//! Writes a synthetic proc/etc tree that `--fixture-root` can read back.

use herakles_proc_monitor::fixture::{generate_manifest, write_fixture};
use herakles_proc_monitor::source::clock_ticks_per_second;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::debug;

pub fn command_generate_fixture(
    output: &Path,
    processes: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    debug!(
        "Generating fixture: processes={}, seed={:?}, output={}",
        processes,
        seed,
        output.display()
    );

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let manifest = generate_manifest(&mut rng, processes, clock_ticks_per_second());
    write_fixture(output, &manifest)?;

    println!(
        "✅ Generated fixture: {} processes in {}",
        manifest.processes.len(),
        output.display()
    );
    Ok(())
}
