//! Repository identity
//!
//! A Repository is owned by the host; the pruner only reads it. Pruning is
//! skipped entirely for repositories with no hosted remote.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Link to the hosting service a repository is associated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedRemote {
    /// Name of the git remote (`origin`)
    pub remote_name: String,
    /// Fetch URL of the remote
    pub url: String,
}

/// A working copy that the pruner maintains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Stable key used for persisted prune state
    pub id: String,
    /// Display name
    pub name: String,
    /// Working copy root
    pub path: PathBuf,
    /// Associated hosted remote, if any
    pub remote: Option<HostedRemote>,
}

impl Repository {
    /// Create a repository whose id is derived from its path
    pub fn new(path: impl Into<PathBuf>, remote: Option<HostedRemote>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: repository_id(&path),
            name,
            path,
            remote,
        }
    }

    /// Whether the repository has a hosted remote
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

/// Compute a stable id for a repository path.
///
/// First 16 hex characters of the SHA-256 of the path.
pub fn repository_id(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    let mut hasher = Sha256::new();
    hasher.update(path_str.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}
