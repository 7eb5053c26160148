// herakles-proc-monitor - version 0.1.0
// Point-in-time system monitor with tracing logging
use anyhow::Context;
use clap::Parser;
use herakles_proc_monitor::config::{load_config, validate_effective_config, Config, LogLevel};
use herakles_proc_monitor::fixture;
use herakles_proc_monitor::{SourceLayout, StatSource, SystemMonitor};
use std::path::PathBuf;
use tracing::{debug, info, level_filters::LevelFilter};

mod cli;
mod commands;

use cli::{Args, Commands};

/// Resolves configuration from CLI args, config file, and defaults.
/// Precedence: CLI (if provided) > config file > default.
/// Also returns the config file that was read, if any.
fn resolve_config(args: &Args) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let (mut config, loaded_from) = if args.no_config {
        (Config::default(), None)
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(ms) = args.sample_interval_ms {
        config.sample_interval_ms = Some(ms);
    }
    if let Some(max) = args.max_processes {
        config.max_processes = Some(max);
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level);
    }

    Ok((config, loaded_from))
}

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(level: LogLevel) -> anyhow::Result<()> {
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Live system layout, or a generated fixture tree when `--fixture-root` is set.
fn build_source(args: &Args) -> anyhow::Result<StatSource> {
    let layout = match &args.fixture_root {
        Some(root) => {
            let manifest = fixture::load_manifest(root)?;
            info!(
                "Reading fixture {} generated at {}",
                root.display(),
                manifest.generated_at
            );
            SourceLayout::rooted_at(root).with_ticks_per_second(manifest.ticks_per_second)
        }
        None => SourceLayout::default(),
    };
    Ok(StatSource::new(layout))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, loaded_from) = resolve_config(&args)?;

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return commands::show_config(&config, args.config_format);
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(config.log_level())?;
    if let Some(path) = &loaded_from {
        info!("Loaded configuration from: {}", path.display());
    }

    let default_command = Commands::Snapshot {
        iterations: 1,
        top: None,
        format: None,
    };
    let command = args.command.as_ref().unwrap_or(&default_command);

    match command {
        Commands::Snapshot {
            iterations,
            top,
            format,
        } => {
            let source = build_source(&args)?;
            let monitor = SystemMonitor::new(source, config.sample_interval())
                .with_max_processes(config.max_processes);
            commands::command_snapshot(
                &monitor,
                *iterations,
                top.unwrap_or_else(|| config.top_n()),
                format.unwrap_or_else(|| config.output_format()),
            )
        }
        Commands::Check { proc, all } => {
            let source = build_source(&args)?;
            commands::command_check(*proc, *all, &source, &config)
        }
        Commands::Config {
            output,
            format,
            commented,
        } => commands::command_config(output.clone(), *format, *commented),
        Commands::GenerateFixture {
            output,
            processes,
            seed,
        } => commands::command_generate_fixture(output, *processes, *seed),
    }
}
