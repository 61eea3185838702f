//! Global configuration.
//!
//! Loaded from .branch-pruner.yml or ~/.config/branch-pruner/branch-pruner.yml

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::daemon::ScheduleConfig;
use crate::pruner::PruneOptions;

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".branch-pruner.yml";

/// Longest accepted timer interval, spacing, or lookback: ten years.
const MAX_HOURS: i64 = 10 * 366 * 24;

/// Global configuration for branch-pruner.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PrunerConfig {
    /// Fallback log level when RUST_LOG is unset.
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Timer and spacing settings.
    pub schedule: ScheduleSection,

    /// Candidate selection and deletion settings.
    pub pruning: PruningSection,

    /// Git settings.
    pub git: GitSection,

    /// Prune state persistence.
    pub storage: StorageSection,

    /// Repositories maintained by `branch-pruner run`.
    pub repositories: Vec<PathBuf>,
}

impl PrunerConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .branch-pruner.yml in current directory
    /// 3. ~/.config/branch-pruner/branch-pruner.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", PROJECT_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", PROJECT_CONFIG_FILE, e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("branch-pruner").join("branch-pruner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_hours == 0 || self.schedule.interval_hours > MAX_HOURS as u64 {
            eyre::bail!("schedule.interval-hours must be between 1 and {}", MAX_HOURS);
        }
        if !(0..=MAX_HOURS).contains(&self.schedule.min_spacing_hours) {
            eyre::bail!("schedule.min-spacing-hours must be between 0 and {}", MAX_HOURS);
        }
        if !(0..=MAX_HOURS / 24).contains(&self.schedule.lookback_days) {
            eyre::bail!("schedule.lookback-days must be between 0 and {}", MAX_HOURS / 24);
        }
        if self.pruning.query_failure_warn_threshold == Some(0) {
            eyre::bail!("pruning.query-failure-warn-threshold must be > 0");
        }
        if self.git.binary.trim().is_empty() {
            eyre::bail!("git.binary must not be empty");
        }
        Ok(())
    }

    /// Scheduler timing derived from this config.
    pub fn schedule_config(&self) -> Result<ScheduleConfig> {
        let interval_secs = self
            .schedule
            .interval_hours
            .checked_mul(60 * 60)
            .ok_or_else(|| eyre::eyre!("schedule.interval-hours is out of range"))?;
        let min_spacing = TimeDelta::try_hours(self.schedule.min_spacing_hours)
            .ok_or_else(|| eyre::eyre!("schedule.min-spacing-hours is out of range"))?;
        let lookback = TimeDelta::try_days(self.schedule.lookback_days)
            .ok_or_else(|| eyre::eyre!("schedule.lookback-days is out of range"))?;

        Ok(ScheduleConfig {
            interval: Duration::from_secs(interval_secs),
            min_spacing,
            lookback,
        })
    }

    /// Pruner options derived from this config.
    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            dry_run: self.pruning.dry_run,
            require_upstream_gone: self.pruning.require_upstream_gone,
            query_failure_warn_threshold: self.pruning.query_failure_warn_threshold,
        }
    }
}

/// Timer and spacing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Hours between timer ticks.
    #[serde(rename = "interval-hours")]
    pub interval_hours: u64,

    /// Minimum hours between automatic prunes.
    #[serde(rename = "min-spacing-hours")]
    pub min_spacing_hours: i64,

    /// Branches checked out within this many days are kept.
    #[serde(rename = "lookback-days")]
    pub lookback_days: i64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            interval_hours: 4,
            min_spacing_hours: 24,
            lookback_days: 14,
        }
    }
}

/// Candidate selection and deletion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PruningSection {
    /// Only mark branches on manual passes without a recency cutoff.
    #[serde(rename = "dry-run")]
    pub dry_run: bool,

    /// Only prune branches whose upstream is gone.
    #[serde(rename = "require-upstream-gone")]
    pub require_upstream_gone: bool,

    /// Consecutive merge-query failures before warning (null = never).
    #[serde(rename = "query-failure-warn-threshold")]
    pub query_failure_warn_threshold: Option<u32>,
}

impl Default for PruningSection {
    fn default() -> Self {
        let options = PruneOptions::default();
        Self {
            dry_run: options.dry_run,
            require_upstream_gone: options.require_upstream_gone,
            query_failure_warn_threshold: options.query_failure_warn_threshold,
        }
    }
}

/// Git settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitSection {
    /// git executable.
    pub binary: String,

    /// Remote that marks a repository as hosted.
    pub remote: String,

    /// Default branch when the remote HEAD is unknown.
    #[serde(rename = "fallback-default-branch")]
    pub fallback_default_branch: String,
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            remote: "origin".to_string(),
            fallback_default_branch: "main".to_string(),
        }
    }
}

/// Prune state persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite database holding last prune dates.
    #[serde(rename = "state-db")]
    pub state_db: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_db: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("branch-pruner")
                .join("prune-state.db"),
        }
    }
}
