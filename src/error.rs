//! Error types for branch-pruner
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while pruning branches
#[derive(Debug, Error)]
pub enum PrunerError {
    /// A git command failed or produced unparseable output
    #[error("VCS error: {0}")]
    Vcs(String),

    /// Prune state persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error from the prune state database
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for branch-pruner operations
pub type Result<T> = std::result::Result<T, PrunerError>;
