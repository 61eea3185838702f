//! Pruning executor - turns an eligible set into deletions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::domain::{MergedBranch, Repository, strip_local_ref};
use crate::vcs::VcsAdapter;

/// What happened to each eligible branch during one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Size of the eligible set handed to the executor
    pub evaluated: usize,
    /// Branches deleted
    pub deleted: Vec<String>,
    /// Branches whose deletion failed
    pub failed: Vec<String>,
    /// Eligible refs that are not local branches
    pub skipped: Vec<String>,
    /// Branches only marked for pruning (dry run)
    pub marked: Vec<String>,
}

impl PruneReport {
    /// Whether this pass evaluated a non-empty eligible set.
    ///
    /// True even when every deletion failed.
    pub fn pruned(&self) -> bool {
        self.evaluated > 0
    }
}

/// Deletes eligible branches one at a time, isolating failures.
pub struct PruningExecutor {
    vcs: Arc<dyn VcsAdapter>,
    /// Preview instead of deleting when no recency cutoff was given
    dry_run: bool,
}

impl PruningExecutor {
    /// Create a new executor.
    pub fn new(vcs: Arc<dyn VcsAdapter>, dry_run: bool) -> Self {
        Self { vcs, dry_run }
    }

    /// Whether a pass with this cutoff only marks branches.
    ///
    /// Dry run applies to manual passes only; automatic passes always
    /// carry a cutoff and always delete.
    pub fn is_preview(&self, recency_cutoff: Option<DateTime<Utc>>) -> bool {
        self.dry_run && recency_cutoff.is_none()
    }

    /// Delete every eligible local branch, in order.
    pub async fn execute(
        &self,
        repo: &Repository,
        eligible: &[MergedBranch],
        recency_cutoff: Option<DateTime<Utc>>,
    ) -> PruneReport {
        let mut report = PruneReport {
            evaluated: eligible.len(),
            ..Default::default()
        };
        let preview = self.is_preview(recency_cutoff);

        for branch in eligible {
            let Some(name) = strip_local_ref(&branch.canonical_ref) else {
                report.skipped.push(branch.canonical_ref.clone());
                continue;
            };

            if preview {
                info!("Branch '{}' marked for pruning", name);
                report.marked.push(name.to_string());
                continue;
            }

            match self.vcs.delete_local_branch(repo, name).await {
                Ok(true) => {
                    info!("Pruned branch {} (was {}) from {}", name, branch.tip, repo.name);
                    report.deleted.push(name.to_string());
                }
                Ok(false) => {
                    warn!("Branch {} was not deleted from {}", name, repo.name);
                    report.failed.push(name.to_string());
                }
                Err(e) => {
                    warn!("Failed to prune branch {} from {}: {}", name, repo.name, e);
                    report.failed.push(name.to_string());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CheckoutRecord;
    use crate::error::{PrunerError, Result};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Fake VCS whose deletions fail for configured names.
    #[derive(Default)]
    struct DeletingVcs {
        fail_for: Vec<String>,
        refuse_for: Vec<String>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VcsAdapter for DeletingVcs {
        async fn merged_branches(&self, _repo: &Repository, _default: &str) -> Result<Vec<MergedBranch>> {
            Ok(Vec::new())
        }

        async fn current_symbolic_ref(&self, _repo: &Repository, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn checkouts_since(&self, _repo: &Repository, _cutoff: DateTime<Utc>) -> Result<CheckoutRecord> {
            Ok(CheckoutRecord::new())
        }

        async fn delete_local_branch(&self, _repo: &Repository, name: &str) -> Result<bool> {
            if self.fail_for.iter().any(|n| n == name) {
                return Err(PrunerError::Vcs(format!("cannot delete {}", name)));
            }
            if self.refuse_for.iter().any(|n| n == name) {
                return Ok(false);
            }
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(true)
        }

        async fn upstream_gone_refs(&self, _repo: &Repository) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }
    }

    fn repo() -> Repository {
        Repository::new("/src/widgets", None)
    }

    fn eligible(refs: &[&str]) -> Vec<MergedBranch> {
        refs.iter().map(|r| MergedBranch::new(*r, "def456")).collect()
    }

    fn cutoff() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_execute_deletes_in_order() {
        let vcs = Arc::new(DeletingVcs::default());
        let executor = PruningExecutor::new(vcs.clone(), false);

        let report = executor
            .execute(&repo(), &eligible(&["refs/heads/b", "refs/heads/a"]), None)
            .await;

        assert!(report.pruned());
        assert_eq!(report.deleted, vec!["b", "a"]);
        assert_eq!(*vcs.deleted.lock().unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_execute_failure_does_not_stop_pass() {
        let vcs = Arc::new(DeletingVcs {
            fail_for: vec!["feature-x".to_string()],
            ..Default::default()
        });
        let executor = PruningExecutor::new(vcs.clone(), false);

        let report = executor
            .execute(&repo(), &eligible(&["refs/heads/feature-x", "refs/heads/feature-y"]), cutoff())
            .await;

        assert!(report.pruned());
        assert_eq!(report.failed, vec!["feature-x"]);
        assert_eq!(report.deleted, vec!["feature-y"]);
    }

    #[tokio::test]
    async fn test_execute_single_failure_still_reports_pruned() {
        let vcs = Arc::new(DeletingVcs {
            fail_for: vec!["feature-x".to_string()],
            ..Default::default()
        });
        let executor = PruningExecutor::new(vcs, false);

        let report = executor.execute(&repo(), &eligible(&["refs/heads/feature-x"]), None).await;

        assert!(report.pruned());
        assert!(report.deleted.is_empty());
        assert_eq!(report.failed, vec!["feature-x"]);
    }

    #[tokio::test]
    async fn test_execute_refused_delete_counts_as_failed() {
        let vcs = Arc::new(DeletingVcs {
            refuse_for: vec!["a".to_string()],
            ..Default::default()
        });
        let executor = PruningExecutor::new(vcs, false);

        let report = executor.execute(&repo(), &eligible(&["refs/heads/a"]), None).await;
        assert_eq!(report.failed, vec!["a"]);
    }

    #[tokio::test]
    async fn test_execute_skips_non_local_refs() {
        let vcs = Arc::new(DeletingVcs::default());
        let executor = PruningExecutor::new(vcs.clone(), false);

        let report = executor
            .execute(
                &repo(),
                &eligible(&["refs/remotes/origin/x", "refs/tags/v1", "refs/heads/y"]),
                None,
            )
            .await;

        assert_eq!(report.evaluated, 3);
        assert_eq!(report.skipped, vec!["refs/remotes/origin/x", "refs/tags/v1"]);
        assert_eq!(report.deleted, vec!["y"]);
    }

    #[tokio::test]
    async fn test_dry_run_without_cutoff_only_marks() {
        let vcs = Arc::new(DeletingVcs::default());
        let executor = PruningExecutor::new(vcs.clone(), true);

        let report = executor.execute(&repo(), &eligible(&["refs/heads/a"]), None).await;

        assert!(report.pruned());
        assert_eq!(report.marked, vec!["a"]);
        assert!(vcs.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_with_cutoff_still_deletes() {
        let vcs = Arc::new(DeletingVcs::default());
        let executor = PruningExecutor::new(vcs.clone(), true);

        let report = executor.execute(&repo(), &eligible(&["refs/heads/a"]), cutoff()).await;

        assert_eq!(report.deleted, vec!["a"]);
        assert!(report.marked.is_empty());
    }

    #[tokio::test]
    async fn test_empty_eligible_set_is_not_pruned() {
        let executor = PruningExecutor::new(Arc::new(DeletingVcs::default()), false);
        let report = executor.execute(&repo(), &[], None).await;
        assert!(!report.pruned());
        assert_eq!(report, PruneReport::default());
    }

    #[test]
    fn test_is_preview() {
        let vcs: Arc<dyn VcsAdapter> = Arc::new(DeletingVcs::default());
        assert!(PruningExecutor::new(vcs.clone(), true).is_preview(None));
        assert!(!PruningExecutor::new(vcs.clone(), true).is_preview(cutoff()));
        assert!(!PruningExecutor::new(vcs, false).is_preview(None));
    }
}
