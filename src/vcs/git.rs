//! GitCli runs VCS queries through the `git` binary.

use std::collections::HashSet;
use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::process::Command;

use super::VcsAdapter;
use crate::domain::{Branch, CheckoutRecord, HostedRemote, MergedBranch, Repository, format_as_local_ref};
use crate::error::{PrunerError, Result};
use crate::storage::RepositoryStateCache;

const CHECKOUT_PREFIX: &str = "checkout: moving from ";

/// VcsAdapter implementation that shells out to git.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Path or name of the git executable
    binary: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    /// Create a new GitCli using the given git executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    /// Run git in `dir` and return the raw output, whatever the exit status.
    async fn output(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| PrunerError::Vcs(format!("Failed to execute git: {}", e)))
    }

    /// Run git in `dir` and return stdout, failing on a non-zero exit.
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let output = self.output(dir, args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrunerError::Vcs(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Build a Repository for the working copy containing `path`.
    ///
    /// The hosted remote is taken from `remote_name`; repositories without
    /// that remote come back with `remote: None` and are never pruned.
    pub async fn open_repository(&self, path: &Path, remote_name: &str) -> Result<Repository> {
        let toplevel = self.run(path, &["rev-parse", "--show-toplevel"]).await?;
        let root = Path::new(toplevel.trim()).to_path_buf();

        let output = self.output(&root, &["remote", "get-url", remote_name]).await?;
        let remote = if output.status.success() {
            let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Some(HostedRemote {
                remote_name: remote_name.to_string(),
                url,
            })
        } else {
            log::debug!("{} has no remote named {}", root.display(), remote_name);
            None
        };

        Ok(Repository::new(root, remote))
    }

    /// Resolve a local branch's tip, `None` if the branch does not exist.
    async fn local_branch(&self, repo: &Repository, name: &str) -> Result<Option<Branch>> {
        let canonical = format_as_local_ref(name);
        let output = self
            .output(&repo.path, &["rev-parse", "--verify", "-q", &canonical])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let tip = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(Branch::local(name, tip)))
    }
}

#[async_trait]
impl VcsAdapter for GitCli {
    async fn merged_branches(&self, repo: &Repository, default_branch: &str) -> Result<Vec<MergedBranch>> {
        let stdout = self
            .run(
                &repo.path,
                &[
                    "for-each-ref",
                    "--merged",
                    default_branch,
                    "--format=%(refname)%00%(objectname)",
                    "refs/heads",
                ],
            )
            .await?;
        Ok(parse_merged_branches(&stdout))
    }

    async fn current_symbolic_ref(&self, repo: &Repository, name: &str) -> Result<Option<String>> {
        let output = self.output(&repo.path, &["symbolic-ref", "-q", name]).await?;

        // Exit 1 with -q means "not a symbolic ref" (detached HEAD)
        match output.status.code() {
            Some(0) => {
                let target = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(if target.is_empty() { None } else { Some(target) })
            }
            Some(1) => Ok(None),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PrunerError::Vcs(format!("Failed to resolve {}: {}", name, stderr.trim())))
            }
        }
    }

    async fn checkouts_since(&self, repo: &Repository, cutoff: DateTime<Utc>) -> Result<CheckoutRecord> {
        let output = self
            .output(
                &repo.path,
                &[
                    "log",
                    "-g",
                    "--date=raw",
                    "--format=%gd%x00%gs",
                    "--grep-reflog=checkout: moving from",
                    "HEAD",
                ],
            )
            .await?;

        // A fresh repository has no HEAD reflog yet
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("does not have any commits") || stderr.contains("unknown revision") {
                return Ok(CheckoutRecord::new());
            }
            return Err(PrunerError::Vcs(format!("Failed to read reflog: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_checkouts(&stdout, cutoff))
    }

    async fn delete_local_branch(&self, repo: &Repository, name: &str) -> Result<bool> {
        self.run(&repo.path, &["branch", "-D", name]).await?;
        Ok(true)
    }

    async fn upstream_gone_refs(&self, repo: &Repository) -> Result<HashSet<String>> {
        let stdout = self
            .run(
                &repo.path,
                &["for-each-ref", "--format=%(refname)%00%(upstream:track)", "refs/heads"],
            )
            .await?;
        Ok(parse_upstream_gone(&stdout))
    }
}

/// RepositoryStateCache that asks git for the remote's default branch.
///
/// Resolves `refs/remotes/<remote>/HEAD` and falls back to a configured
/// branch name. The branch must exist locally to be returned.
#[derive(Debug, Clone)]
pub struct GitStateCache {
    git: GitCli,
    remote_name: String,
    fallback_branch: String,
}

impl GitStateCache {
    /// Create a new GitStateCache.
    pub fn new(git: GitCli, remote_name: impl Into<String>, fallback_branch: impl Into<String>) -> Self {
        Self {
            git,
            remote_name: remote_name.into(),
            fallback_branch: fallback_branch.into(),
        }
    }

    async fn remote_head(&self, repo: &Repository) -> Option<String> {
        let remote_head = format!("refs/remotes/{}/HEAD", self.remote_name);
        let prefix = format!("refs/remotes/{}/", self.remote_name);
        match self.git.current_symbolic_ref(repo, &remote_head).await {
            Ok(Some(target)) => target.strip_prefix(&prefix).map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                log::debug!("Failed to resolve {} in {}: {}", remote_head, repo.name, e);
                None
            }
        }
    }
}

#[async_trait]
impl RepositoryStateCache for GitStateCache {
    async fn default_branch(&self, repo: &Repository) -> Option<Branch> {
        let name = self
            .remote_head(repo)
            .await
            .unwrap_or_else(|| self.fallback_branch.clone());

        match self.git.local_branch(repo, &name).await {
            Ok(branch) => branch,
            Err(e) => {
                log::debug!("Failed to resolve default branch {} in {}: {}", name, repo.name, e);
                None
            }
        }
    }
}

/// Parse `for-each-ref --format=%(refname)%00%(objectname)` output.
pub fn parse_merged_branches(stdout: &str) -> Vec<MergedBranch> {
    stdout
        .lines()
        .filter_map(|line| {
            let (canonical_ref, tip) = line.split_once('\0')?;
            if canonical_ref.is_empty() {
                return None;
            }
            Some(MergedBranch::new(canonical_ref, tip.trim()))
        })
        .collect()
}

/// Parse `log -g --date=raw --format=%gd%x00%gs` output.
///
/// Each line looks like `HEAD@{1700000000 +0100}\0checkout: moving from a to b`.
/// The branch moved *to* is recorded; entries before `cutoff` are dropped.
pub fn parse_checkouts(stdout: &str, cutoff: DateTime<Utc>) -> CheckoutRecord {
    let mut checkouts = CheckoutRecord::new();

    for line in stdout.lines() {
        let Some((selector, subject)) = line.split_once('\0') else {
            continue;
        };
        let Some(timestamp) = parse_reflog_timestamp(selector) else {
            continue;
        };
        if timestamp < cutoff {
            continue;
        }
        let Some(moves) = subject.strip_prefix(CHECKOUT_PREFIX) else {
            continue;
        };
        let Some((_, to)) = moves.rsplit_once(" to ") else {
            continue;
        };
        let to = to.trim();
        if to.is_empty() {
            continue;
        }

        checkouts
            .entry(to.to_string())
            .and_modify(|seen| {
                if timestamp > *seen {
                    *seen = timestamp;
                }
            })
            .or_insert(timestamp);
    }

    checkouts
}

/// Extract the unix time from a reflog selector like `HEAD@{1700000000 +0100}`.
fn parse_reflog_timestamp(selector: &str) -> Option<DateTime<Utc>> {
    let start = selector.find("@{")? + 2;
    let end = selector[start..].find('}')? + start;
    let secs: i64 = selector[start..end].split_whitespace().next()?.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Parse `for-each-ref --format=%(refname)%00%(upstream:track)` output.
pub fn parse_upstream_gone(stdout: &str) -> HashSet<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let (canonical_ref, track) = line.split_once('\0')?;
            (track.trim() == "[gone]").then(|| canonical_ref.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_parse_merged_branches() {
        let stdout = "refs/heads/feature-x\0def456\nrefs/heads/master\0aaa111\n";
        let merged = parse_merged_branches(stdout);
        assert_eq!(
            merged,
            vec![
                MergedBranch::new("refs/heads/feature-x", "def456"),
                MergedBranch::new("refs/heads/master", "aaa111"),
            ]
        );
    }

    #[test]
    fn test_parse_merged_branches_skips_garbage() {
        let stdout = "\nnot-a-record\n\0abc\nrefs/heads/ok\0123\n";
        let merged = parse_merged_branches(stdout);
        assert_eq!(merged, vec![MergedBranch::new("refs/heads/ok", "123")]);
    }

    #[test]
    fn test_parse_reflog_timestamp() {
        assert_eq!(parse_reflog_timestamp("HEAD@{1700000000 +0100}"), Some(ts(1_700_000_000)));
        assert_eq!(parse_reflog_timestamp("HEAD@{1700000000}"), Some(ts(1_700_000_000)));
        assert_eq!(parse_reflog_timestamp("HEAD@{0}x"), Some(ts(0)));
        assert_eq!(parse_reflog_timestamp("HEAD"), None);
        assert_eq!(parse_reflog_timestamp("HEAD@{soon}"), None);
    }

    #[test]
    fn test_parse_checkouts_records_target_branch() {
        let stdout = "HEAD@{1700000300 +0000}\0checkout: moving from main to feature-x\n\
                      HEAD@{1700000200 +0000}\0checkout: moving from feature-x to main\n\
                      HEAD@{1700000100 +0000}\0checkout: moving from main to feature-x\n";
        let checkouts = parse_checkouts(stdout, ts(0));
        assert_eq!(checkouts.len(), 2);
        assert_eq!(checkouts["feature-x"], ts(1_700_000_300));
        assert_eq!(checkouts["main"], ts(1_700_000_200));
    }

    #[test]
    fn test_parse_checkouts_cutoff_is_inclusive() {
        let stdout = "HEAD@{1700000200 +0000}\0checkout: moving from main to at-cutoff\n\
                      HEAD@{1700000199 +0000}\0checkout: moving from main to before-cutoff\n";
        let checkouts = parse_checkouts(stdout, ts(1_700_000_200));
        assert!(checkouts.contains_key("at-cutoff"));
        assert!(!checkouts.contains_key("before-cutoff"));
    }

    #[test]
    fn test_parse_checkouts_ignores_other_entries() {
        let stdout = "HEAD@{1700000300 +0000}\0commit: add widget\n\
                      HEAD@{1700000200 +0000}\0reset: moving to HEAD~1\n\
                      garbage line\n";
        let checkouts = parse_checkouts(stdout, ts(0));
        assert!(checkouts.is_empty());
    }

    #[test]
    fn test_parse_upstream_gone() {
        let stdout = "refs/heads/feature-x\0[gone]\n\
                      refs/heads/feature-y\0[ahead 1]\n\
                      refs/heads/main\0\n";
        let gone = parse_upstream_gone(stdout);
        assert_eq!(gone.len(), 1);
        assert!(gone.contains("refs/heads/feature-x"));
    }

    #[test]
    fn test_git_cli_default_binary() {
        let git = GitCli::default();
        assert_eq!(git.binary, "git");
    }
}
