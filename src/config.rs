//! TOML configuration for taskpulse.
//!
//! Every section has sensible defaults so the daemon runs with no config
//! file at all. The file path comes from, in order: the `--config` flag,
//! the `TASKPULSE_CONFIG` environment variable, then
//! `/etc/taskpulse/taskpulse.toml`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scheduler::SchedulerConfig;

const SYSTEM_CONFIG_PATH: &str = "/etc/taskpulse/taskpulse.toml";

/// Root configuration for the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub task: TaskSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Seconds between task attempts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds an attempt may run before health reports down.
    #[serde(default = "default_max_duration_secs")]
    pub max_expected_task_duration_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_expected_task_duration_secs: default_max_duration_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Bind address for the HTTP interface.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// The task to run. When `command` is unset, the daemon runs a built-in
/// no-op task in the worker executor (useful for wiring checks).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSection {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Enable debug logging (same as the `--debug` flag).
    #[serde(default)]
    pub debug: bool,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_max_duration_secs() -> u64 {
    5
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve and load the configuration, falling back to defaults when
    /// no file exists anywhere.
    pub fn load_auto(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(env_path) = std::env::var("TASKPULSE_CONFIG") {
            return Self::load(Path::new(&env_path));
        }
        let system = Path::new(SYSTEM_CONFIG_PATH);
        if system.exists() {
            return Self::load(system);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.scheduler.interval_secs),
            max_expected_task_duration: Duration::from_secs(
                self.scheduler.max_expected_task_duration_secs,
            ),
        }
    }
}
