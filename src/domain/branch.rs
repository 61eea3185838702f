//! Branch snapshots returned by VCS queries

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reserved::format_as_local_ref;

/// A local branch as seen at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Short name (`feature-x`)
    pub name: String,
    /// Tip commit hash
    pub tip: String,
    /// Fully qualified ref (`refs/heads/feature-x`)
    pub canonical_ref: String,
}

impl Branch {
    /// Create a local branch snapshot from its short name and tip
    pub fn local(name: impl Into<String>, tip: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            canonical_ref: format_as_local_ref(&name),
            name,
            tip: tip.into(),
        }
    }
}

/// A branch reported as merged into the default branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedBranch {
    pub canonical_ref: String,
    pub tip: String,
}

impl MergedBranch {
    pub fn new(canonical_ref: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            canonical_ref: canonical_ref.into(),
            tip: tip.into(),
        }
    }
}

/// Local branch name -> most recent checkout time within a lookback window
pub type CheckoutRecord = HashMap<String, DateTime<Utc>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_local() {
        let branch = Branch::local("main", "abc123");
        assert_eq!(branch.name, "main");
        assert_eq!(branch.tip, "abc123");
        assert_eq!(branch.canonical_ref, "refs/heads/main");
    }

    #[test]
    fn test_merged_branch_new() {
        let merged = MergedBranch::new("refs/heads/feature-x", "def456");
        assert_eq!(merged.canonical_ref, "refs/heads/feature-x");
        assert_eq!(merged.tip, "def456");
    }
}
