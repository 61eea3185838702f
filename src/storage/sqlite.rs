//! SQLite-backed prune state, one row per repository.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::traits::PruneStateStore;
use crate::error::{PrunerError, Result};

/// PruneStateStore persisting timestamps in a SQLite database.
///
/// rusqlite's Connection isn't Sync, so it sits behind a Mutex. Queries run
/// on the blocking pool; one store is shared by every scheduler in a host.
pub struct SqlitePruneStore {
    path: PathBuf,
    db: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqlitePruneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePruneStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqlitePruneStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let db = Connection::open(&path)?;
        Self::init_schema(&db)?;

        Ok(Self {
            path,
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prune_state (
                repo_id TEXT PRIMARY KEY,
                last_prune_attempt_ms INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|e| PrunerError::Storage(e.to_string()))?;
            f(&db)
        })
        .await
        .map_err(|e| PrunerError::Storage(format!("Prune state query did not complete: {}", e)))?
    }
}

#[async_trait]
impl PruneStateStore for SqlitePruneStore {
    async fn last_prune_date(&self, repo_id: &str) -> Result<Option<DateTime<Utc>>> {
        let repo_id = repo_id.to_string();
        self.with_connection(move |db| {
            let millis: Option<i64> = db
                .query_row(
                    "SELECT last_prune_attempt_ms FROM prune_state WHERE repo_id = ?1",
                    params![repo_id],
                    |row| row.get(0),
                )
                .optional()?;

            match millis {
                None => Ok(None),
                Some(ms) => Utc
                    .timestamp_millis_opt(ms)
                    .single()
                    .map(Some)
                    .ok_or_else(|| PrunerError::Storage(format!("Invalid timestamp {} for {}", ms, repo_id))),
            }
        })
        .await
    }

    async fn update_last_prune_attempt_date(&self, repo_id: &str, date: DateTime<Utc>) -> Result<()> {
        let repo_id = repo_id.to_string();
        self.with_connection(move |db| {
            db.execute(
                "INSERT INTO prune_state (repo_id, last_prune_attempt_ms) VALUES (?1, ?2)
                 ON CONFLICT(repo_id) DO UPDATE SET last_prune_attempt_ms = excluded.last_prune_attempt_ms",
                params![repo_id, date.timestamp_millis()],
            )?;
            Ok(())
        })
        .await
    }
}
