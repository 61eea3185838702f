//! Branch pruning for a single repository.
//!
//! - **Selector**: intersects merge status, HEAD, reserved refs and checkout
//!   recency into an eligible set.
//! - **Executor**: deletes the eligible set, isolating per-branch failures.
//! - **Pruner**: looks up the default branch and runs one pass of both.

mod executor;
mod selector;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::domain::{MergedBranch, Repository};
use crate::storage::RepositoryStateCache;
use crate::vcs::VcsAdapter;

pub use executor::{PruneReport, PruningExecutor};
pub use selector::{CandidateSelector, eligible_branches, recent_checkout_refs};

/// Options controlling which branches are selected and how they are removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOptions {
    /// Only mark branches on manual passes without a cutoff
    pub dry_run: bool,
    /// Only prune branches whose upstream is gone
    pub require_upstream_gone: bool,
    /// Consecutive merge-query failures before logging at warn (None = never)
    pub query_failure_warn_threshold: Option<u32>,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            require_upstream_gone: false,
            query_failure_warn_threshold: Some(5),
        }
    }
}

/// Prunes merged branches from one repository.
pub struct Pruner {
    repository: Repository,
    state_cache: Arc<dyn RepositoryStateCache>,
    selector: CandidateSelector,
    executor: PruningExecutor,
}

impl Pruner {
    /// Create a new Pruner for `repository`.
    pub fn new(
        repository: Repository,
        vcs: Arc<dyn VcsAdapter>,
        state_cache: Arc<dyn RepositoryStateCache>,
        options: PruneOptions,
    ) -> Self {
        let selector = CandidateSelector::new(vcs.clone())
            .with_require_upstream_gone(options.require_upstream_gone)
            .with_failure_warn_threshold(options.query_failure_warn_threshold);
        let executor = PruningExecutor::new(vcs, options.dry_run);
        Self {
            repository,
            state_cache,
            selector,
            executor,
        }
    }

    /// The repository this pruner maintains.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Compute the eligible set without deleting anything.
    pub async fn candidates(&self, recency_cutoff: Option<DateTime<Utc>>) -> Vec<MergedBranch> {
        let Some(default_branch) = self.state_cache.default_branch(&self.repository).await else {
            debug!("No default branch known for {}, nothing to prune", self.repository.name);
            return Vec::new();
        };
        self.selector
            .select(&self.repository, &default_branch, recency_cutoff)
            .await
    }

    /// Run one pruning pass.
    ///
    /// `recency_cutoff` protects branches checked out at or after it; `None`
    /// disables the recency filter.
    pub async fn prune(&self, recency_cutoff: Option<DateTime<Utc>>) -> PruneReport {
        let Some(default_branch) = self.state_cache.default_branch(&self.repository).await else {
            debug!("No default branch known for {}, nothing to prune", self.repository.name);
            return PruneReport::default();
        };

        let eligible = self
            .selector
            .select(&self.repository, &default_branch, recency_cutoff)
            .await;
        if eligible.is_empty() {
            debug!("No branches ready for pruning in {}", self.repository.name);
            return PruneReport::default();
        }

        info!(
            "Pruning {} branches that have been merged into the default branch, {} ({}), from '{}'",
            eligible.len(),
            default_branch.name,
            default_branch.tip,
            self.repository.name
        );

        self.executor
            .execute(&self.repository, &eligible, recency_cutoff)
            .await
    }
}
