//! Storage layer for branch-pruner.
//!
//! Two external collaborators are modeled here:
//! - [`PruneStateStore`]: persisted "last pruned" timestamps keyed by repository
//! - [`RepositoryStateCache`]: the host's view of each repository's default branch
//!
//! SQLite and in-memory implementations are provided; hosts with their own
//! persistence implement the traits directly.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryPruneStore, MemoryStateCache};
pub use sqlite::SqlitePruneStore;
pub use traits::{PruneStateStore, RepositoryStateCache};
