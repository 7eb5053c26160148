//! Configuration loading, validation and rendering.
//!
//! Precedence is CLI > config file > built-in defaults. Files may be YAML,
//! JSON or TOML; the format is picked by extension with YAML as fallback.

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 30;
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TOP_N: usize = 25;

/// Locations searched when no `--config` is given.
pub const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "/etc/herakles/proc-monitor.yaml",
    "/etc/herakles/proc-monitor.yml",
    "/etc/herakles/proc-monitor.json",
    "./herakles-proc-monitor.yaml",
    "./herakles-proc-monitor.yml",
    "./herakles-proc-monitor.json",
];

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// How a snapshot is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Sampling
    #[serde(alias = "sample-interval-ms")]
    pub sample_interval_ms: Option<u64>,
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,

    // Output
    #[serde(alias = "top-n")]
    pub top_n: Option<usize>,
    #[serde(alias = "output-format")]
    pub output_format: Option<OutputFormat>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<LogLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_interval_ms: Some(DEFAULT_SAMPLE_INTERVAL_MS),
            max_processes: None,
            top_n: Some(DEFAULT_TOP_N),
            output_format: Some(OutputFormat::Text),
            log_level: Some(LogLevel::Info),
        }
    }
}

impl Config {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS))
    }

    pub fn top_n(&self) -> usize {
        self.top_n.unwrap_or(DEFAULT_TOP_N)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.unwrap_or(OutputFormat::Text)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if let Some(ms) = cfg.sample_interval_ms {
        if ms == 0 || ms > MAX_SAMPLE_INTERVAL_MS {
            bail!(
                "sample_interval_ms must be between 1 and {}, got {}",
                MAX_SAMPLE_INTERVAL_MS,
                ms
            );
        }
    }

    if cfg.max_processes == Some(0) {
        bail!("max_processes must be greater than 0 when set");
    }

    Ok(())
}

/// Resolves which config file to read: `path` when given (it must exist),
/// otherwise the first existing default location.
pub fn locate_config(path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            Ok(Some(p.to_path_buf()))
        }
        None => Ok(DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())),
    }
}

/// Loads a config file, or the first existing default location when `path`
/// is `None`. No file at all yields the defaults.
///
/// Returns the file that was read alongside the config. This runs before
/// logging is set up, so the caller logs the location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let Some(path) = locate_config(path)? else {
        return Ok((Config::default(), None));
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok((config, Some(path)))
}

/// Parses config text; `extension` selects JSON or TOML, anything else is YAML.
pub fn parse_config(content: &str, extension: Option<&str>) -> anyhow::Result<Config> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Serializes a config in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Annotates a rendered YAML config with a comment above each known key.
pub fn add_config_comments(yaml: String) -> String {
    let mut out = String::from("# herakles-proc-monitor configuration\n");
    for line in yaml.lines() {
        let comment = match line.split(':').next().unwrap_or_default() {
            "sample_interval_ms" => {
                Some("# Delay between the two /proc/stat reads of a CPU sample (1-1000)")
            }
            "max_processes" => {
                Some("# Upper bound on processes captured per refresh (lowest pids first)")
            }
            "top_n" => Some("# Processes shown in text output (0 = all)"),
            "output_format" => Some("# text | json | yaml"),
            "log_level" => Some("# off | error | warn | info | debug | trace"),
            _ => None,
        };
        if let Some(c) = comment {
            out.push('\n');
            out.push_str(c);
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
