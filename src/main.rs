use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use branch_pruner::clock::{Clock, SystemClock};
use branch_pruner::config::{PrunerConfig, load_config};
use branch_pruner::daemon::{BranchPruner, callback};
use branch_pruner::domain::strip_local_ref;
use branch_pruner::pruner::Pruner;
use branch_pruner::storage::{PruneStateStore, SqlitePruneStore};
use branch_pruner::vcs::{GitCli, GitStateCache};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(level: LevelFilter) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("branch-pruner")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("branch-pruner.log");

    // Setup env_logger with file output; RUST_LOG overrides the level
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn log_level(cli: &Cli, config: &PrunerConfig) -> LevelFilter {
    if cli.is_verbose() {
        return LevelFilter::Debug;
    }
    config
        .log_level
        .as_deref()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Build a scheduler for the repository at `path`.
async fn build_scheduler(config: &PrunerConfig, path: &Path, store: Arc<dyn PruneStateStore>) -> Result<BranchPruner> {
    let git = GitCli::new(&config.git.binary);
    let repository = git
        .open_repository(path, &config.git.remote)
        .await
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;

    let state_cache = Arc::new(GitStateCache::new(
        git.clone(),
        &config.git.remote,
        &config.git.fallback_default_branch,
    ));
    let pruner = Pruner::new(repository, Arc::new(git), state_cache, config.prune_options());

    Ok(BranchPruner::new(pruner, store, config.schedule_config()?).with_notifier(callback(|repo| async move {
        println!("{} pruned merged branches in {}", "Done:".green(), repo.name);
    })))
}

fn open_store(config: &PrunerConfig) -> Result<Arc<dyn PruneStateStore>> {
    let store = SqlitePruneStore::open(&config.storage.state_db)
        .with_context(|| format!("Failed to open prune state at {}", config.storage.state_db.display()))?;
    Ok(Arc::new(store))
}

async fn run_application(cli: &Cli, config: &PrunerConfig) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run { repos } => handle_run_command(repos, config).await,
        Commands::Prune {
            repo,
            dry_run,
            no_recency,
        } => handle_prune_command(repo, *dry_run, *no_recency, config).await,
        Commands::Candidates { repo, no_recency } => handle_candidates_command(repo, *no_recency, config).await,
        Commands::Status { repo, json } => handle_status_command(repo, *json, config).await,
    }
}

async fn handle_run_command(repos: &[PathBuf], config: &PrunerConfig) -> Result<()> {
    let paths = if repos.is_empty() { &config.repositories[..] } else { repos };
    if paths.is_empty() {
        eyre::bail!("No repositories given; pass --repo or list them under `repositories` in the config");
    }

    let store = open_store(config)?;
    let mut schedulers = Vec::new();
    for path in paths {
        let scheduler = build_scheduler(config, path, store.clone()).await?;
        if !scheduler.repository().has_remote() {
            println!(
                "{} {} has no remote named {}, it will not be pruned",
                "Warning:".yellow(),
                scheduler.repository().name,
                config.git.remote
            );
        }
        schedulers.push(scheduler);
    }

    for scheduler in &schedulers {
        info!("Starting scheduler for {}", scheduler.repository().name);
        println!("{} {}", "Watching:".cyan(), scheduler.repository().path.display());
        scheduler.start().await;
    }

    tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;

    println!("{}", "Shutting down...".cyan());
    for scheduler in &schedulers {
        scheduler.stop();
    }
    Ok(())
}

async fn handle_prune_command(repo: &Path, dry_run: bool, no_recency: bool, config: &PrunerConfig) -> Result<()> {
    info!("Manual prune of {} (dry run: {}, no recency: {})", repo.display(), dry_run, no_recency);
    let store = open_store(config)?;
    let scheduler = build_scheduler(config, repo, store).await?;
    let cutoff = recency_cutoff(no_recency, config)?;

    if dry_run {
        return handle_candidates(&scheduler, cutoff).await;
    }

    let report = scheduler.prune_with_report(cutoff).await;
    if !report.pruned() {
        println!("{}", "Nothing to prune".green());
        return Ok(());
    }
    for name in &report.deleted {
        println!("{} {}", "Deleted:".green(), name);
    }
    for name in &report.marked {
        println!("{} {}", "Marked:".yellow(), name);
    }
    for name in &report.failed {
        println!("{} {}", "Failed:".red(), name);
    }
    Ok(())
}

async fn handle_candidates_command(repo: &Path, no_recency: bool, config: &PrunerConfig) -> Result<()> {
    info!("Listing prune candidates for {}", repo.display());
    let store = open_store(config)?;
    let scheduler = build_scheduler(config, repo, store).await?;
    handle_candidates(&scheduler, recency_cutoff(no_recency, config)?).await
}

async fn handle_candidates(scheduler: &BranchPruner, cutoff: Option<chrono::DateTime<chrono::Utc>>) -> Result<()> {
    let candidates = scheduler.candidates(cutoff).await;
    if candidates.is_empty() {
        println!("{}", "Nothing to prune".green());
        return Ok(());
    }
    for branch in candidates {
        let name = strip_local_ref(&branch.canonical_ref).unwrap_or(&branch.canonical_ref);
        println!("{} {} ({})", "Would prune:".yellow(), name, branch.tip);
    }
    Ok(())
}

async fn handle_status_command(repo: &Path, json: bool, config: &PrunerConfig) -> Result<()> {
    let git = GitCli::new(&config.git.binary);
    let repository = git
        .open_repository(repo, &config.git.remote)
        .await
        .with_context(|| format!("Failed to open repository at {}", repo.display()))?;
    let store = open_store(config)?;
    let last_pruned = store.last_prune_date(&repository.id).await?;

    if json {
        let status = serde_json::json!({
            "id": repository.id,
            "name": repository.name,
            "path": repository.path,
            "remote": repository.remote.as_ref().map(|remote| &remote.url),
            "last_pruned": last_pruned.map(|date| date.to_rfc3339()),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} {}", "Repository:".green(), repository.name);
    match &repository.remote {
        Some(remote) => println!("  Remote: {} ({})", remote.remote_name, remote.url),
        None => println!("  Remote: {}", "none, pruning disabled".yellow()),
    }
    match last_pruned {
        Some(date) => println!("  Last pruned: {}", date.to_rfc3339()),
        None => println!("  Last pruned: never"),
    }
    Ok(())
}

fn recency_cutoff(no_recency: bool, config: &PrunerConfig) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    if no_recency {
        return Ok(None);
    }
    let lookback = config.schedule_config()?.lookback;
    let cutoff = SystemClock
        .now()
        .checked_sub_signed(lookback)
        .ok_or_else(|| eyre::eyre!("Lookback of {} reaches before the earliest supported date", lookback))?;
    Ok(Some(cutoff))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(log_level(&cli, &config)).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
