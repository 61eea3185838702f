//! branch-pruner - background pruning of merged local branches
//!
//! Periodically deletes local branches that are merged into the default
//! branch, not recently checked out, and not one of a reserved set of
//! well-known names. Intended to run inside a longer-lived host process.

pub mod clock;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod pruner;
pub mod storage;
pub mod vcs;

pub use error::{PrunerError, Result};
