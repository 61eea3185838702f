//! CLI module for branch-pruner - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for scheduled pruning,
//! manual passes, and inspection.

pub mod commands;

pub use commands::Cli;
