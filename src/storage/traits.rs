//! Storage trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Branch, Repository};
use crate::error::Result;

/// Persistent "last pruned" timestamps, one entry per repository.
#[async_trait]
pub trait PruneStateStore: Send + Sync {
    /// Last recorded prune attempt, `None` if the repository was never pruned.
    async fn last_prune_date(&self, repo_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Record a prune attempt at `date`.
    async fn update_last_prune_attempt_date(&self, repo_id: &str, date: DateTime<Utc>) -> Result<()>;
}

/// Current repository state as known to the host.
#[async_trait]
pub trait RepositoryStateCache: Send + Sync {
    /// The repository's default branch, if one is known.
    async fn default_branch(&self, repo: &Repository) -> Option<Branch>;
}
