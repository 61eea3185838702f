//! BranchPruner - background pruning schedule for one repository
//!
//! Two states: Idle (no timer) and Running (timer armed). Each timer tick
//! runs a background pass that:
//! 1. Skips repositories without a hosted remote
//! 2. Skips if the last prune was within the minimum spacing
//! 3. Prunes with a recency cutoff of now minus the lookback window
//! 4. Records the attempt, and notifies the host if anything was pruned

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::notifier::PruneCompletedCallback;
use super::timer::{RepeatingTask, schedule_repeating};
use crate::clock::{Clock, SystemClock};
use crate::domain::{MergedBranch, Repository};
use crate::pruner::{PruneReport, Pruner};
use crate::storage::PruneStateStore;

/// Timing configuration for background pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// How often the timer fires
    pub interval: Duration,
    /// Minimum real time between automatic prunes, across restarts
    pub min_spacing: TimeDelta,
    /// Branches checked out within this window are kept
    pub lookback: TimeDelta,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4 * 60 * 60),
            min_spacing: TimeDelta::hours(24),
            lookback: TimeDelta::weeks(2),
        }
    }
}

/// Result of a single background pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Repository has no hosted remote
    SkippedNoRemote,
    /// Another pass for this repository is still running
    SkippedInFlight,
    /// Last prune is newer than the minimum spacing allows
    SkippedRecentlyPruned { last_pruned: DateTime<Utc> },
    /// Prune state could not be read
    Failed(String),
    /// The pass ran; the report says what was pruned
    Completed(PruneReport),
}

impl PassOutcome {
    /// Whether the pass evaluated a non-empty eligible set
    pub fn pruned(&self) -> bool {
        matches!(self, PassOutcome::Completed(report) if report.pruned())
    }
}

struct Inner {
    pruner: Pruner,
    store: Arc<dyn PruneStateStore>,
    clock: Arc<dyn Clock>,
    notifier: Option<PruneCompletedCallback>,
    config: ScheduleConfig,
    /// Serializes passes for this repository
    pass_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    async fn run_background_prune(&self) -> PassOutcome {
        let repo = self.pruner.repository();

        if !repo.has_remote() {
            log::debug!("{} has no hosted remote, skipping prune", repo.name);
            return PassOutcome::SkippedNoRemote;
        }

        let Ok(_pass) = self.pass_lock.try_lock() else {
            log::debug!("Prune of {} already in progress, skipping tick", repo.name);
            return PassOutcome::SkippedInFlight;
        };

        let last_pruned = match self.store.last_prune_date(&repo.id).await {
            Ok(last) => last,
            Err(e) => {
                log::warn!("Failed to read last prune date for {}: {}", repo.name, e);
                return PassOutcome::Failed(e.to_string());
            }
        };

        let now = self.clock.now();
        let (Some(threshold), Some(cutoff)) = (
            now.checked_sub_signed(self.config.min_spacing),
            now.checked_sub_signed(self.config.lookback),
        ) else {
            log::warn!(
                "Spacing {} or lookback {} for {} is out of the supported date range",
                self.config.min_spacing,
                self.config.lookback,
                repo.name
            );
            return PassOutcome::Failed(format!("schedule window out of range at {}", now));
        };
        if let Some(last) = last_pruned
            && last > threshold
        {
            log::info!("Last prune of {} took place at {} - skipping", repo.name, last);
            return PassOutcome::SkippedRecentlyPruned { last_pruned: last };
        }

        let report = self.pruner.prune(Some(cutoff)).await;

        if let Err(e) = self
            .store
            .update_last_prune_attempt_date(&repo.id, self.clock.now())
            .await
        {
            log::warn!("Failed to record prune attempt for {}: {}", repo.name, e);
        }

        tracing::info!(
            repository = %repo.name,
            evaluated = report.evaluated,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Background prune finished"
        );

        if report.pruned() {
            self.notify(repo.clone());
        }

        PassOutcome::Completed(report)
    }

    /// Fire the completion callback without waiting on it.
    fn notify(&self, repo: Repository) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        tokio::spawn(async move {
            notifier(repo).await;
        });
    }
}

/// Runs background pruning for one repository on a repeating timer.
pub struct BranchPruner {
    inner: Arc<Inner>,
    timer: Mutex<Option<RepeatingTask>>,
}

impl BranchPruner {
    /// Create an idle scheduler.
    pub fn new(pruner: Pruner, store: Arc<dyn PruneStateStore>, config: ScheduleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pruner,
                store,
                clock: Arc::new(SystemClock),
                notifier: None,
                config,
                pass_lock: tokio::sync::Mutex::new(()),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Use a different time source.
    ///
    /// # Panics
    /// If called after the scheduler has been started.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.inner_mut().clock = clock;
        self
    }

    /// Set the callback invoked after a pass that pruned something.
    ///
    /// # Panics
    /// If called after the scheduler has been started.
    pub fn with_notifier(mut self, notifier: PruneCompletedCallback) -> Self {
        self.inner_mut().notifier = Some(notifier);
        self
    }

    fn inner_mut(&mut self) -> &mut Inner {
        Arc::get_mut(&mut self.inner).expect("BranchPruner configured after start")
    }

    /// The repository being maintained.
    pub fn repository(&self) -> &Repository {
        self.inner.pruner.repository()
    }

    /// Timing configuration.
    pub fn config(&self) -> &ScheduleConfig {
        &self.inner.config
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.timer.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Arm the repeating timer and run one pass immediately.
    ///
    /// # Panics
    /// If the scheduler is already running. Two schedules for the same
    /// repository indicate a host bug.
    pub async fn start(&self) -> PassOutcome {
        {
            let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
            if timer.is_some() {
                drop(timer);
                panic!("BranchPruner already started for {}", self.repository().name);
            }

            let inner = self.inner.clone();
            *timer = Some(schedule_repeating(self.inner.config.interval, move || {
                let inner = inner.clone();
                async move {
                    inner.run_background_prune().await;
                }
            }));
        }

        log::info!(
            "Started branch pruning for {} every {:?}",
            self.repository().name,
            self.inner.config.interval
        );
        self.inner.run_background_prune().await
    }

    /// Cancel the timer. A pass already in progress is allowed to finish.
    pub fn stop(&self) {
        let task = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.cancel();
            log::info!("Stopped branch pruning for {}", self.repository().name);
        }
    }

    /// Run one background pass now, honoring the minimum spacing.
    pub async fn run_background_prune(&self) -> PassOutcome {
        self.inner.run_background_prune().await
    }

    /// Prune immediately, bypassing the schedule.
    ///
    /// Returns true if an eligible set was evaluated. With `dry_run`
    /// configured and no cutoff, branches are only marked.
    pub async fn prune(&self, recency_cutoff: Option<DateTime<Utc>>) -> bool {
        self.prune_with_report(recency_cutoff).await.pruned()
    }

    /// Like [`BranchPruner::prune`], returning the full report.
    pub async fn prune_with_report(&self, recency_cutoff: Option<DateTime<Utc>>) -> PruneReport {
        let _pass = self.inner.pass_lock.lock().await;
        self.inner.pruner.prune(recency_cutoff).await
    }

    /// Branches a prune with this cutoff would evaluate, without deleting.
    pub async fn candidates(&self, recency_cutoff: Option<DateTime<Utc>>) -> Vec<MergedBranch> {
        self.inner.pruner.candidates(recency_cutoff).await
    }
}

impl Drop for BranchPruner {
    fn drop(&mut self) {
        self.stop();
    }
}
