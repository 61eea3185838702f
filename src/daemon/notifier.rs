//! Completion notification after a pass that pruned something.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::domain::Repository;

/// Host callback invoked after a background pass that pruned branches.
pub type PruneCompletedCallback = Arc<dyn Fn(Repository) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a completion callback.
pub fn callback<F, Fut>(f: F) -> PruneCompletedCallback
where
    F: Fn(Repository) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |repo| f(repo).boxed())
}

/// Completion callback that forwards the repository over a channel.
pub fn channel_notifier(tx: mpsc::UnboundedSender<Repository>) -> PruneCompletedCallback {
    Arc::new(move |repo: Repository| {
        let tx = tx.clone();
        async move {
            if let Err(e) = tx.send(repo) {
                log::debug!("Prune completion receiver dropped for {}", e.0.name);
            }
        }
        .boxed()
    })
}
