//! Repeating timer with an explicit cancellation handle.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to a task scheduled with [`schedule_repeating`].
///
/// Cancelling (or dropping) the handle prevents future runs. A run that is
/// already in progress completes normally.
#[derive(Debug)]
pub struct RepeatingTask {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl RepeatingTask {
    /// Stop scheduling further runs.
    pub fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Run `task` every `period`, starting one period from now.
///
/// Runs never overlap: a tick that comes due while a run is in progress is
/// skipped.
///
/// # Panics
/// If `period` is zero.
pub fn schedule_repeating<F, Fut>(period: Duration, mut task: F) -> RepeatingTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    assert!(!period.is_zero(), "repeating task period must be non-zero");

    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                // Fires on cancel() and when the handle is dropped
                _ = &mut cancel_rx => break,
                _ = interval.tick() => {}
            }
            task().await;
        }
    });

    RepeatingTask {
        cancel_tx: Some(cancel_tx),
    }
}
