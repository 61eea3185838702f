//! Domain types for branch-pruner
//!
//! This module contains the core domain types:
//! - Repository: the working copy being maintained, with its optional hosted remote
//! - Branch / MergedBranch: snapshots of local branch refs
//! - Reserved refs: the closed set of refs that are never pruned

pub mod branch;
pub mod repository;
pub mod reserved;

pub use branch::{Branch, CheckoutRecord, MergedBranch};
pub use repository::{HostedRemote, Repository, repository_id};
pub use reserved::{LOCAL_REF_PREFIX, RESERVED_REFS, format_as_local_ref, is_reserved, strip_local_ref};
