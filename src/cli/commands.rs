//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: keep repositories pruned on a schedule until interrupted
//! - prune: run one manual pass
//! - candidates: show what would be pruned
//! - status: show when a repository was last pruned

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// branch-pruner - delete local branches already merged into the default branch
#[derive(Parser, Debug)]
#[command(name = "branch-pruner")]
#[command(author, version = env!("GIT_DESCRIBE"), about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prune repositories on a schedule until interrupted
    Run {
        /// Repository to maintain (repeatable; defaults to the config list)
        #[arg(short, long = "repo")]
        repos: Vec<PathBuf>,
    },

    /// Run one pruning pass now
    Prune {
        /// Repository path
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Only report branches that would be pruned
        #[arg(long)]
        dry_run: bool,

        /// Ignore recent checkout activity
        #[arg(long)]
        no_recency: bool,
    },

    /// List branches eligible for pruning without deleting them
    Candidates {
        /// Repository path
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Ignore recent checkout activity
        #[arg(long)]
        no_recency: bool,
    },

    /// Show when a repository was last pruned
    Status {
        /// Repository path
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
}
