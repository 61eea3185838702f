//! In-memory storage implementations, used by tests and embedding hosts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::traits::{PruneStateStore, RepositoryStateCache};
use crate::domain::{Branch, Repository};
use crate::error::{PrunerError, Result};

/// PruneStateStore backed by a HashMap.
#[derive(Debug, Default)]
pub struct MemoryPruneStore {
    dates: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryPruneStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PruneStateStore for MemoryPruneStore {
    async fn last_prune_date(&self, repo_id: &str) -> Result<Option<DateTime<Utc>>> {
        let dates = self.dates.read().map_err(|e| PrunerError::Storage(e.to_string()))?;
        Ok(dates.get(repo_id).copied())
    }

    async fn update_last_prune_attempt_date(&self, repo_id: &str, date: DateTime<Utc>) -> Result<()> {
        let mut dates = self.dates.write().map_err(|e| PrunerError::Storage(e.to_string()))?;
        dates.insert(repo_id.to_string(), date);
        Ok(())
    }
}

/// RepositoryStateCache backed by a HashMap keyed by repository id.
#[derive(Debug, Default)]
pub struct MemoryStateCache {
    default_branches: RwLock<HashMap<String, Branch>>,
}

impl MemoryStateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the default branch for a repository.
    pub fn set_default_branch(&self, repo_id: &str, branch: Branch) {
        let mut map = self.default_branches.write().unwrap_or_else(|e| e.into_inner());
        map.insert(repo_id.to_string(), branch);
    }

    /// Forget the default branch for a repository.
    pub fn clear_default_branch(&self, repo_id: &str) {
        let mut map = self.default_branches.write().unwrap_or_else(|e| e.into_inner());
        map.remove(repo_id);
    }
}

#[async_trait]
impl RepositoryStateCache for MemoryStateCache {
    async fn default_branch(&self, repo: &Repository) -> Option<Branch> {
        let map = self.default_branches.read().unwrap_or_else(|e| e.into_inner());
        map.get(&repo.id).cloned()
    }
}
