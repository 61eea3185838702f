//! Background pruning integration tests
//!
//! Runs BranchPruner against an in-memory VCS and a SQLite state store, with
//! restarts simulated by building a fresh scheduler on the same database.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use branch_pruner::clock::ManualClock;
use branch_pruner::daemon::{BranchPruner, PassOutcome, ScheduleConfig, channel_notifier};
use branch_pruner::domain::{Branch, CheckoutRecord, HostedRemote, MergedBranch, Repository};
use branch_pruner::error::{PrunerError, Result};
use branch_pruner::pruner::{PruneOptions, Pruner};
use branch_pruner::storage::{MemoryStateCache, PruneStateStore, SqlitePruneStore};
use branch_pruner::vcs::VcsAdapter;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Local branches of one repository; every branch counts as merged.
#[derive(Default)]
struct Branches {
    names: Mutex<Vec<String>>,
    head: Mutex<Option<String>>,
    checkouts: Mutex<CheckoutRecord>,
    fail_merge_query: Mutex<bool>,
}

impl Branches {
    fn new(names: &[&str]) -> Arc<Self> {
        let branches = Self::default();
        *branches.names.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        *branches.head.lock().unwrap() = Some("refs/heads/main".to_string());
        Arc::new(branches)
    }

    fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    fn add(&self, name: &str) {
        self.names.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl VcsAdapter for Branches {
    async fn merged_branches(&self, _repo: &Repository, _default_branch: &str) -> Result<Vec<MergedBranch>> {
        if *self.fail_merge_query.lock().unwrap() {
            return Err(PrunerError::Vcs("fatal: bad revision".to_string()));
        }
        Ok(self
            .names()
            .iter()
            .map(|n| MergedBranch::new(format!("refs/heads/{}", n), "0123abcd"))
            .collect())
    }

    async fn current_symbolic_ref(&self, _repo: &Repository, _name: &str) -> Result<Option<String>> {
        Ok(self.head.lock().unwrap().clone())
    }

    async fn checkouts_since(&self, _repo: &Repository, _cutoff: DateTime<Utc>) -> Result<CheckoutRecord> {
        Ok(self.checkouts.lock().unwrap().clone())
    }

    async fn delete_local_branch(&self, _repo: &Repository, name: &str) -> Result<bool> {
        self.names.lock().unwrap().retain(|n| n != name);
        Ok(true)
    }

    async fn upstream_gone_refs(&self, _repo: &Repository) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
}

fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap()
}

fn widgets() -> Repository {
    Repository::new(
        "/src/widgets",
        Some(HostedRemote {
            remote_name: "origin".to_string(),
            url: "git@github.com:acme/widgets.git".to_string(),
        }),
    )
}

fn scheduler(
    vcs: Arc<Branches>,
    store: Arc<dyn PruneStateStore>,
    clock: Arc<ManualClock>,
    tx: mpsc::UnboundedSender<Repository>,
) -> BranchPruner {
    let repo = widgets();
    let cache = Arc::new(MemoryStateCache::new());
    cache.set_default_branch(&repo.id, Branch::local("main", "0123abcd"));
    let pruner = Pruner::new(repo, vcs, cache, PruneOptions::default());
    BranchPruner::new(pruner, store, ScheduleConfig::default())
        .with_clock(clock)
        .with_notifier(channel_notifier(tx))
}

#[tokio::test]
async fn test_spacing_survives_restart() -> Result<()> {
    let temp = TempDir::new()?;
    let db = temp.path().join("state").join("prune-state.db");
    let vcs = Branches::new(&["main", "feature-x"]);
    let clock = Arc::new(ManualClock::new(monday_morning()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let store = Arc::new(SqlitePruneStore::open(&db)?);
        let first = scheduler(vcs.clone(), store, clock.clone(), tx.clone());
        assert!(first.start().await.pruned());
        first.stop();
    }
    assert_eq!(rx.recv().await.map(|r| r.name), Some("widgets".to_string()));
    assert_eq!(vcs.names(), vec!["main"]);

    // Restarted an hour later with new work merged
    vcs.add("feature-y");
    clock.advance(TimeDelta::hours(1));
    let store = Arc::new(SqlitePruneStore::open(&db)?);
    let second = scheduler(vcs.clone(), store.clone(), clock.clone(), tx.clone());

    let outcome = second.start().await;
    second.stop();
    assert_eq!(
        outcome,
        PassOutcome::SkippedRecentlyPruned {
            last_pruned: monday_morning()
        }
    );
    assert_eq!(vcs.names(), vec!["main", "feature-y"]);

    // A day later the next pass goes ahead
    clock.advance(TimeDelta::days(1));
    let outcome = second.run_background_prune().await;
    assert!(outcome.pruned());
    assert_eq!(vcs.names(), vec!["main"]);
    assert_eq!(
        store.last_prune_date(&widgets().id).await?,
        Some(monday_morning() + TimeDelta::hours(25))
    );
    Ok(())
}

#[tokio::test]
async fn test_recent_checkout_protects_branch() -> Result<()> {
    let vcs = Branches::new(&["main", "feature-x", "hotfix"]);
    vcs.checkouts
        .lock()
        .unwrap()
        .insert("hotfix".to_string(), monday_morning() - TimeDelta::days(2));
    let clock = Arc::new(ManualClock::new(monday_morning()));
    let store = Arc::new(SqlitePruneStore::open_in_memory()?);
    let (tx, _rx) = mpsc::unbounded_channel();
    let scheduler = scheduler(vcs.clone(), store, clock, tx);

    let outcome = scheduler.run_background_prune().await;

    match outcome {
        PassOutcome::Completed(report) => assert_eq!(report.deleted, vec!["feature-x"]),
        other => panic!("Expected completed pass, got {:?}", other),
    }
    assert_eq!(vcs.names(), vec!["main", "hotfix"]);
    Ok(())
}

#[tokio::test]
async fn test_checked_out_branch_is_never_pruned() -> Result<()> {
    let vcs = Branches::new(&["main", "feature-x"]);
    *vcs.head.lock().unwrap() = Some("refs/heads/feature-x".to_string());
    let clock = Arc::new(ManualClock::new(monday_morning()));
    let store = Arc::new(SqlitePruneStore::open_in_memory()?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = scheduler(vcs.clone(), store, clock, tx);

    let outcome = scheduler.run_background_prune().await;

    assert!(!outcome.pruned());
    assert_eq!(vcs.names(), vec!["main", "feature-x"]);
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_failed_merge_query_prunes_nothing_but_records_attempt() -> Result<()> {
    let vcs = Branches::new(&["main", "feature-x"]);
    *vcs.fail_merge_query.lock().unwrap() = true;
    let clock = Arc::new(ManualClock::new(monday_morning()));
    let store = Arc::new(SqlitePruneStore::open_in_memory()?);
    let (tx, _rx) = mpsc::unbounded_channel();
    let scheduler = scheduler(vcs.clone(), store.clone(), clock.clone(), tx);

    assert!(!scheduler.run_background_prune().await.pruned());
    assert_eq!(store.last_prune_date(&widgets().id).await?, Some(monday_morning()));

    // Manual passes are not subject to spacing
    assert!(!scheduler.prune(None).await);
    assert_eq!(vcs.names(), vec!["main", "feature-x"]);

    *vcs.fail_merge_query.lock().unwrap() = false;
    assert!(scheduler.prune(None).await);
    assert_eq!(vcs.names(), vec!["main"]);
    Ok(())
}
