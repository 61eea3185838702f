//! VCS query adapter
//!
//! The pruner never shells out directly: every repository query goes
//! through [`VcsAdapter`], so the decision logic can be driven by fakes in
//! tests and by [`GitCli`] in production.

mod git;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CheckoutRecord, MergedBranch, Repository};
use crate::error::Result;

pub use git::{GitCli, GitStateCache, parse_checkouts, parse_merged_branches, parse_upstream_gone};

/// Repository queries and mutations needed to prune branches
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    /// Local branches whose history is contained in `default_branch`, in ref order
    async fn merged_branches(&self, repo: &Repository, default_branch: &str) -> Result<Vec<MergedBranch>>;

    /// Target of a symbolic ref such as `HEAD`; `None` when detached or unset
    async fn current_symbolic_ref(&self, repo: &Repository, name: &str) -> Result<Option<String>>;

    /// Local branch name -> latest checkout time, for checkouts at or after `cutoff`
    async fn checkouts_since(&self, repo: &Repository, cutoff: DateTime<Utc>) -> Result<CheckoutRecord>;

    /// Delete a local branch by short name
    async fn delete_local_branch(&self, repo: &Repository, name: &str) -> Result<bool>;

    /// Canonical refs of local branches whose upstream no longer exists
    async fn upstream_gone_refs(&self, repo: &Repository) -> Result<HashSet<String>>;
}
