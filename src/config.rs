//! Configuration Module
//!
//! Handles configuration loading from a YAML file and command-line
//! arguments, with validation of the cleaner's timing knobs.

use crate::{ReaperError, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Custom deserializer for Duration from string format like "30s", "5m", "12h"
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        // Find where the number ends and the unit begins
        let mut num_end = 0;
        for (i, c) in s.chars().enumerate() {
            if c.is_ascii_digit() || c == '.' {
                num_end = i + 1;
            } else {
                break;
            }
        }

        if num_end == 0 {
            return Err(format!("no number found in duration string: {}", s));
        }

        let num_str = &s[..num_end];
        let value: f64 = num_str
            .parse()
            .map_err(|e| format!("failed to parse number '{}': {}", num_str, e))?;

        let duration = match s[num_end..].trim() {
            "ms" | "millis" | "milliseconds" => Duration::from_secs_f64(value / 1000.0),
            "s" | "sec" | "secs" | "second" | "seconds" | "" => Duration::from_secs_f64(value),
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs_f64(value * 60.0),
            "h" | "hr" | "hrs" | "hour" | "hours" => Duration::from_secs_f64(value * 3600.0),
            "d" | "day" | "days" => Duration::from_secs_f64(value * 86400.0),
            unit => return Err(format!("unknown duration unit: {}", unit)),
        };

        Ok(duration)
    }
}

/// How the cleaner disposes of abandoned WAL directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Remove abandoned directories from disk
    #[default]
    Delete,
    /// Only log what would be removed
    DryRun,
}

/// Cleaner tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct CleanerConfig {
    /// Minimum time since the last WAL write before an unowned directory
    /// counts as abandoned (default: 12h)
    #[serde(default = "default_min_age", with = "duration_serde")]
    pub min_age: Duration,

    /// Interval between reconciliation passes (default: 30m)
    #[serde(default = "default_period", with = "duration_serde")]
    pub period: Duration,

    /// Delete abandoned directories or only report them (default: delete)
    #[serde(default)]
    pub mode: CleanupMode,
}

fn default_min_age() -> Duration {
    Duration::from_secs(12 * 3600)
}

fn default_period() -> Duration {
    Duration::from_secs(30 * 60)
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            min_age: default_min_age(),
            period: default_period(),
            mode: CleanupMode::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (overridden by RUST_LOG when set)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for daily-rolling application log files; console-only when
    /// unset
    #[serde(default)]
    pub app_log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            app_log_dir: None,
        }
    }
}

/// A statically configured ingestion instance
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Instance name; its WAL storage lives at `<wal_root>/<name>`
    pub name: String,
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Root directory holding one WAL storage directory per instance
    #[serde(default)]
    pub wal_root: PathBuf,

    #[serde(default)]
    pub cleaner: CleanerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Instances this agent manages
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,

    /// Run one reconciliation pass immediately at startup
    #[serde(default)]
    pub clean_on_start: bool,
}

impl Config {
    /// Load configuration from CLI arguments plus an optional YAML file
    pub fn load() -> Result<Config> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches)
    }

    fn command() -> Command {
        Command::new("wal-reaper")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Reclaims orphaned WAL directories left behind by removed ingestion instances")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Path to YAML configuration file"),
            )
            .arg(
                Arg::new("wal-root")
                    .long("wal-root")
                    .value_name("DIR")
                    .help("Root directory holding per-instance WAL storage"),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level filter (error, warn, info, debug, trace)"),
            )
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("Log abandoned directories without deleting them"),
            )
            .arg(
                Arg::new("clean-on-start")
                    .long("clean-on-start")
                    .action(ArgAction::SetTrue)
                    .help("Run one reconciliation pass immediately at startup"),
            )
    }

    fn from_matches(matches: &ArgMatches) -> Result<Config> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Config::default(),
        };

        if let Some(root) = matches.get_one::<String>("wal-root") {
            config.wal_root = PathBuf::from(root);
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            config.logging.log_level = level.clone();
        }
        if matches.get_flag("dry-run") {
            config.cleaner.mode = CleanupMode::DryRun;
        }
        if matches.get_flag("clean-on-start") {
            config.clean_on_start = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReaperError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse YAML configuration contents
    pub fn from_yaml(contents: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Check invariants the cleaner depends on
    pub fn validate(&self) -> Result<()> {
        if self.wal_root.as_os_str().is_empty() {
            return Err(ReaperError::Config(
                "wal_root must be set (config file or --wal-root)".to_string(),
            ));
        }
        if self.cleaner.min_age.is_zero() {
            return Err(ReaperError::Config(
                "cleaner.min_age must be greater than zero".to_string(),
            ));
        }
        if self.cleaner.period.is_zero() {
            return Err(ReaperError::Config(
                "cleaner.period must be greater than zero".to_string(),
            ));
        }

        if self.cleaner.min_age < Duration::from_secs(60) {
            warn!(
                "cleaner.min_age ({:?}) is unusually low; recently removed instances may lose unshipped WAL data",
                self.cleaner.min_age
            );
        }

        Ok(())
    }
}
