//! Configuration system for branch-pruner.
//!
//! A single YAML file configures the schedule, candidate selection, git
//! access, and where prune state is persisted.

use std::path::PathBuf;

use eyre::Result;

pub use self::global::{GitSection, PROJECT_CONFIG_FILE, PrunerConfig, PruningSection, ScheduleSection, StorageSection};

mod global;

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .branch-pruner.yml in current directory (project config)
/// 3. ~/.config/branch-pruner/branch-pruner.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<PrunerConfig> {
    PrunerConfig::load(explicit_path)
}
