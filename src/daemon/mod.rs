//! Daemon Core - background pruning schedule
//!
//! The daemon side of branch-pruner:
//! - Arms a repeating timer per repository
//! - Enforces minimum spacing between automatic prunes using persisted state
//! - Notifies the host after passes that pruned something

pub mod notifier;
pub mod scheduler;
pub mod timer;

pub use notifier::{PruneCompletedCallback, callback, channel_notifier};
pub use scheduler::{BranchPruner, PassOutcome, ScheduleConfig};
pub use timer::{RepeatingTask, schedule_repeating};
