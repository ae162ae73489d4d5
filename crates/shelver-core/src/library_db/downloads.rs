//! Download rows: create-if-absent by correlation key, status transitions.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::db::{new_id, unix_timestamp, LibraryDb};
use super::types::{Download, DownloadMetadata, DownloadStatus, NewDownload};

const DOWNLOAD_COLUMNS: &str = "id, title, library_item_id, client_id, status, progress, \
     total_size, started_at, completed_at, final_path, metadata_json";

fn row_to_download(row: &SqliteRow) -> Result<Download> {
    let metadata_json: String = row.get("metadata_json");
    let metadata: DownloadMetadata = if metadata_json.trim().is_empty() {
        DownloadMetadata::default()
    } else {
        serde_json::from_str(&metadata_json).context("decode download metadata")?
    };
    let status: String = row.get("status");
    let progress: i64 = row.get("progress");
    Ok(Download {
        id: row.get("id"),
        title: row.get("title"),
        library_item_id: row.get("library_item_id"),
        client_id: row.get("client_id"),
        status: DownloadStatus::from_str(&status),
        progress: progress.clamp(0, 100) as u8,
        total_size: row.get("total_size"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        final_path: row.get("final_path"),
        metadata,
    })
}

impl LibraryDb {
    /// Insert a queued download. When the metadata carries a correlation key
    /// that is already known, the existing row is returned instead.
    pub async fn insert_download(&self, new: &NewDownload) -> Result<Download> {
        let now = unix_timestamp();
        let id = new_id();
        let key = new.metadata.correlation_key();
        let metadata_json = serde_json::to_string(&new.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO downloads (
                id, title, library_item_id, client_id, correlation_key, status,
                progress, total_size, metadata_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)
            ON CONFLICT(correlation_key) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.library_item_id)
        .bind(&new.client_id)
        .bind(&key)
        .bind(DownloadStatus::Queued.as_str())
        .bind(new.total_size)
        .bind(metadata_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let existing = match key.as_deref() {
            Some(k) => self.find_download_by_correlation_key(k).await?,
            None => self.get_download(&id).await?,
        };
        existing.context("download row missing after insert")
    }

    pub async fn get_download(&self, id: &str) -> Result<Option<Download>> {
        let row = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_download).transpose()
    }

    /// Look up by client correlation key (case-insensitive for torrent hashes).
    pub async fn find_download_by_correlation_key(&self, key: &str) -> Result<Option<Download>> {
        let row = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE correlation_key = ?1 \
             OR correlation_key = lower(?1)"
        ))
        .bind(key.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_download).transpose()
    }

    /// All downloads, newest first.
    pub async fn list_downloads(&self) -> Result<Vec<Download>> {
        let rows = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_download).collect()
    }

    /// Record progress for a download that is still in flight. Terminal rows
    /// are left alone. Returns whether a row changed.
    pub async fn update_download_progress(&self, id: &str, progress: u8) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = 'downloading',
                progress = ?1,
                started_at = COALESCE(started_at, ?2),
                updated_at = ?2
            WHERE id = ?3
              AND status IN ('queued', 'downloading')
            "#,
        )
        .bind(progress.min(100) as i64)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Transition to Completed with progress 100. Returns true only for the
    /// call that performed the transition.
    pub async fn mark_download_completed(&self, id: &str) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = 'completed',
                progress = 100,
                completed_at = ?1,
                updated_at = ?1
            WHERE id = ?2
              AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Transition to Failed. Returns true only for the call that performed it.
    pub async fn mark_download_failed(&self, id: &str) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = 'failed',
                updated_at = ?1
            WHERE id = ?2
              AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Merge `metadata` into the stored map (new values win).
    pub async fn merge_download_metadata(&self, id: &str, metadata: &DownloadMetadata) -> Result<()> {
        let Some(mut download) = self.get_download(id).await? else {
            anyhow::bail!("download {id} not found");
        };
        for (k, v) in metadata.iter() {
            download.metadata.set(k, v);
        }
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE downloads
            SET metadata_json = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(serde_json::to_string(&download.metadata)?)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_download_final_path(&self, id: &str, path: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE downloads
            SET final_path = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(path)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
