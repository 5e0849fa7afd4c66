//! Configuration module for Worksteal
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/worksteal/worksteal.toml)
//! - User configuration (~/.worksteal.toml)
//! - Project configuration (./worksteal.toml)
//! - Environment variables
//! - Command-line arguments (applied by the CLI on top of the result)

use crate::error::Error;
use crate::runtime::ShutdownPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool settings
    pub scheduler: SchedulerConfig,

    /// Simulated execution settings
    pub execution: ExecutionConfig,

    /// Terminal output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of workers in the pool.
    ///
    /// Defaults to the number of available CPU cores.
    pub num_workers: usize,

    /// What happens to queued tasks on shutdown
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: default_workers(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// How the simulated execution unit spends a task's cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Await a timer; no CPU is consumed
    #[default]
    Sleep,
    /// Busy-loop on a blocking thread until the cost has elapsed
    Spin,
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sleep" => Ok(Self::Sleep),
            "spin" => Ok(Self::Spin),
            other => Err(Error::invalid_config(
                "execution.mode",
                format!("unknown mode '{}', expected sleep or spin", other),
            )),
        }
    }
}

/// Simulated execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Sleep or spin
    pub mode: ExecutionMode,

    /// Milliseconds of simulated work per unit of cost estimate
    pub time_scale: f64,

    /// Random spread applied to each duration, as a fraction (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sleep,
            time_scale: 1.0,
            jitter: 0.0,
        }
    }
}

/// Terminal output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Enable colored output
    pub color: bool,

    /// How often `run` prints a worker snapshot
    #[serde(with = "humantime_serde")]
    pub snapshot_interval: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            snapshot_interval: Duration::from_millis(500),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::invalid_config(
                "logging.format",
                format!("unknown format '{}', expected pretty or json", other),
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter when neither -v nor RUST_LOG is given
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/worksteal/worksteal.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".worksteal.toml"));
        }

        paths.push(PathBuf::from("worksteal.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(path, e))?,
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(path, e))?,
            "toml" => toml::from_str(&content).map_err(|e| parse_error(path, e))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values that differ from the
    /// defaults win.
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();

        fn pick<T: PartialEq + Clone>(base: &T, other: T, default: &T) -> T {
            if &other != default {
                other
            } else {
                base.clone()
            }
        }

        Config {
            scheduler: SchedulerConfig {
                num_workers: pick(
                    &self.scheduler.num_workers,
                    other.scheduler.num_workers,
                    &defaults.scheduler.num_workers,
                ),
                shutdown_policy: pick(
                    &self.scheduler.shutdown_policy,
                    other.scheduler.shutdown_policy,
                    &defaults.scheduler.shutdown_policy,
                ),
            },
            execution: ExecutionConfig {
                mode: pick(
                    &self.execution.mode,
                    other.execution.mode,
                    &defaults.execution.mode,
                ),
                time_scale: pick(
                    &self.execution.time_scale,
                    other.execution.time_scale,
                    &defaults.execution.time_scale,
                ),
                jitter: pick(
                    &self.execution.jitter,
                    other.execution.jitter,
                    &defaults.execution.jitter,
                ),
            },
            output: OutputConfig {
                color: pick(&self.output.color, other.output.color, &defaults.output.color),
                snapshot_interval: pick(
                    &self.output.snapshot_interval,
                    other.output.snapshot_interval,
                    &defaults.output.snapshot_interval,
                ),
            },
            logging: LoggingConfig {
                level: pick(&self.logging.level, other.logging.level, &defaults.logging.level),
                format: pick(
                    &self.logging.format,
                    other.logging.format,
                    &defaults.logging.format,
                ),
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // WORKSTEAL_WORKERS
        if let Ok(workers) = std::env::var("WORKSTEAL_WORKERS") {
            self.scheduler.num_workers = workers
                .parse()
                .with_context(|| format!("Invalid WORKSTEAL_WORKERS value: {}", workers))?;
        }

        // WORKSTEAL_SHUTDOWN_POLICY
        if let Ok(policy) = std::env::var("WORKSTEAL_SHUTDOWN_POLICY") {
            self.scheduler.shutdown_policy = policy.parse()?;
        }

        // WORKSTEAL_EXECUTION_MODE
        if let Ok(mode) = std::env::var("WORKSTEAL_EXECUTION_MODE") {
            self.execution.mode = mode.parse()?;
        }

        // WORKSTEAL_TIME_SCALE
        if let Ok(scale) = std::env::var("WORKSTEAL_TIME_SCALE") {
            self.execution.time_scale = scale
                .parse()
                .with_context(|| format!("Invalid WORKSTEAL_TIME_SCALE value: {}", scale))?;
        }

        // WORKSTEAL_LOG_FORMAT
        if let Ok(format) = std::env::var("WORKSTEAL_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("WORKSTEAL_NO_COLOR").is_ok() {
            self.output.color = false;
        }

        Ok(())
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.scheduler.num_workers == 0 {
            return Err(Error::invalid_config(
                "scheduler.num_workers",
                "must be at least 1",
            ));
        }
        if !self.execution.time_scale.is_finite() || self.execution.time_scale < 0.0 {
            return Err(Error::invalid_config(
                "execution.time_scale",
                "must be a finite, non-negative number",
            ));
        }
        if !(0.0..=1.0).contains(&self.execution.jitter) {
            return Err(Error::invalid_config(
                "execution.jitter",
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }

    /// Load from a specific file, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::default().merge_from_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
