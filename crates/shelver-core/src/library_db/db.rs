//! SQLite-backed library database implementation.
//!
//! Handles connection, migrations, and timestamp helpers. CRUD for each
//! table lives in its own module.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS downloads (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        library_item_id TEXT,
        client_id TEXT,
        correlation_key TEXT UNIQUE,
        status TEXT NOT NULL,
        progress INTEGER NOT NULL DEFAULT 0,
        total_size INTEGER,
        started_at INTEGER,
        completed_at INTEGER,
        final_path TEXT,
        metadata_json TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS processing_jobs (
        id TEXT PRIMARY KEY,
        download_id TEXT NOT NULL,
        source_path TEXT NOT NULL,
        target_item_id TEXT,
        status TEXT NOT NULL,
        attempt_count INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        completed_at INTEGER
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_processing_jobs_download
    ON processing_jobs (download_id, created_at)
    "#,
    // At most one active job per download, even across processes.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_processing_jobs_one_active
    ON processing_jobs (download_id)
    WHERE status IN ('pending', 'processing', 'retry')
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS move_jobs (
        id TEXT PRIMARY KEY,
        library_item_id TEXT NOT NULL,
        destination_path TEXT NOT NULL,
        destination_key TEXT NOT NULL,
        source_path TEXT NOT NULL,
        status TEXT NOT NULL,
        attempt_count INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        completed_at INTEGER
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_move_jobs_one_active
    ON move_jobs (library_item_id, destination_key)
    WHERE status IN ('queued', 'processing')
    "#,
    // Folder of each known library item; imports for a linked item land here.
    r#"
    CREATE TABLE IF NOT EXISTS library_items (
        id TEXT PRIMARY KEY,
        base_path TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
];

/// Handle to the SQLite-backed library database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/shelver/library.db` on Debian.
#[derive(Clone)]
pub struct LibraryDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl LibraryDb {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("shelver")?;
        let state_dir = xdg_dirs.get_state_home().join("shelver");
        Self::open_at(state_dir.join("library.db")).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await
            .with_context(|| format!("open {}", path.display()))?;
        let db = LibraryDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("library db migration")?;
        }
        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps and age scoring).
pub use crate::clock::unix_timestamp;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<LibraryDb> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = LibraryDb { pool };
    db.migrate().await?;
    Ok(db)
}
