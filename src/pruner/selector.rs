//! Candidate selection - which merged branches are safe to delete.
//!
//! A branch is eligible only if it is merged into the default branch, is not
//! the default branch itself, is not reserved, is not the checked-out branch,
//! and (when a recency cutoff is given) was not checked out on or after the
//! cutoff.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::domain::{Branch, CheckoutRecord, MergedBranch, Repository, format_as_local_ref, is_reserved};
use crate::vcs::VcsAdapter;

/// Compute the eligible set from already-gathered inputs.
///
/// Order of `merged` is preserved.
pub fn eligible_branches(
    merged: Vec<MergedBranch>,
    default_ref: &str,
    current_head: Option<&str>,
    recently_checked_out: &HashSet<String>,
) -> Vec<MergedBranch> {
    merged
        .into_iter()
        .filter(|b| b.canonical_ref != default_ref)
        .filter(|b| !is_reserved(&b.canonical_ref))
        .filter(|b| current_head != Some(b.canonical_ref.as_str()))
        .filter(|b| !recently_checked_out.contains(&b.canonical_ref))
        .collect()
}

/// Canonical refs of branches checked out at or after `cutoff`.
pub fn recent_checkout_refs(checkouts: &CheckoutRecord, cutoff: DateTime<Utc>) -> HashSet<String> {
    checkouts
        .iter()
        .filter(|(_, at)| **at >= cutoff)
        .map(|(name, _)| format_as_local_ref(name))
        .collect()
}

/// Gathers merge, HEAD and checkout data from the VCS and selects candidates.
pub struct CandidateSelector {
    vcs: Arc<dyn VcsAdapter>,
    /// Only keep branches whose upstream is gone
    require_upstream_gone: bool,
    /// Consecutive merge-query failures before logging at warn
    failure_warn_threshold: Option<u32>,
    consecutive_failures: AtomicU32,
}

impl CandidateSelector {
    /// Create a new selector.
    pub fn new(vcs: Arc<dyn VcsAdapter>) -> Self {
        Self {
            vcs,
            require_upstream_gone: false,
            failure_warn_threshold: None,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Only select branches whose upstream tracking ref is gone.
    pub fn with_require_upstream_gone(mut self, require: bool) -> Self {
        self.require_upstream_gone = require;
        self
    }

    /// Escalate merge-query failures to warn after `threshold` in a row.
    pub fn with_failure_warn_threshold(mut self, threshold: Option<u32>) -> Self {
        self.failure_warn_threshold = threshold;
        self
    }

    /// Merge-query failures since the last successful query.
    pub fn consecutive_query_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Select branches eligible for pruning, in merge-query order.
    ///
    /// Never fails: a query that cannot be answered yields an empty set.
    pub async fn select(
        &self,
        repo: &Repository,
        default_branch: &Branch,
        recency_cutoff: Option<DateTime<Utc>>,
    ) -> Vec<MergedBranch> {
        let merged = match self.vcs.merged_branches(repo, &default_branch.name).await {
            Ok(merged) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                merged
            }
            Err(e) => {
                self.record_query_failure(repo, &e.to_string());
                Vec::new()
            }
        };

        if merged.is_empty() {
            debug!("No branches merged into {} in {}", default_branch.name, repo.name);
            return Vec::new();
        }

        let current_head = match self.vcs.current_symbolic_ref(repo, "HEAD").await {
            Ok(head) => head,
            Err(e) => {
                debug!("Cannot resolve HEAD in {}, selecting nothing: {}", repo.name, e);
                return Vec::new();
            }
        };

        let recently_checked_out = match recency_cutoff {
            None => HashSet::new(),
            Some(cutoff) => match self.vcs.checkouts_since(repo, cutoff).await {
                Ok(checkouts) => recent_checkout_refs(&checkouts, cutoff),
                Err(e) => {
                    debug!("Cannot read checkout history in {}, selecting nothing: {}", repo.name, e);
                    return Vec::new();
                }
            },
        };

        let mut eligible = eligible_branches(
            merged,
            &default_branch.canonical_ref,
            current_head.as_deref(),
            &recently_checked_out,
        );

        if self.require_upstream_gone && !eligible.is_empty() {
            match self.vcs.upstream_gone_refs(repo).await {
                Ok(gone) => eligible.retain(|b| gone.contains(&b.canonical_ref)),
                Err(e) => {
                    debug!("Cannot read upstream tracking in {}, selecting nothing: {}", repo.name, e);
                    return Vec::new();
                }
            }
        }

        eligible
    }

    fn record_query_failure(&self, repo: &Repository, error: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failure_warn_threshold {
            Some(threshold) if failures >= threshold => warn!(
                "Listing merged branches in {} has failed {} times in a row: {}",
                repo.name, failures, error
            ),
            _ => debug!("Failed to list merged branches in {}: {}", repo.name, error),
        }
    }
}
