//! Move job CRUD: dedup on (item, destination), claim, completion.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::db::{new_id, unix_timestamp, LibraryDb};
use super::types::{Enqueued, MoveJob, MoveJobStatus};

const MOVE_COLUMNS: &str = "id, library_item_id, destination_path, source_path, status, \
     attempt_count, last_error, created_at, updated_at, completed_at";

fn row_to_move_job(row: &SqliteRow) -> MoveJob {
    let status: String = row.get("status");
    let attempt_count: i64 = row.get("attempt_count");
    MoveJob {
        id: row.get("id"),
        library_item_id: row.get("library_item_id"),
        destination_path: row.get("destination_path"),
        source_path: row.get("source_path"),
        status: MoveJobStatus::from_str(&status),
        attempt_count: attempt_count.max(0) as u32,
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

/// Destinations compare case-insensitively and ignore a trailing separator.
fn destination_key(path: &str) -> String {
    path.trim().trim_end_matches(['/', '\\']).to_lowercase()
}

impl LibraryDb {
    /// Queue a move unless an active job already targets the same item and
    /// destination, in which case that job is returned.
    pub async fn enqueue_move_job(
        &self,
        library_item_id: &str,
        destination_path: &str,
        source_path: &str,
    ) -> Result<Enqueued<MoveJob>> {
        let now = unix_timestamp();
        let key = destination_key(destination_path);
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(&format!(
            "SELECT {MOVE_COLUMNS} FROM move_jobs \
             WHERE library_item_id = ?1 AND destination_key = ?2 \
               AND status IN ('queued', 'processing') \
             LIMIT 1"
        ))
        .bind(library_item_id)
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = existing {
            tx.commit().await?;
            return Ok(Enqueued {
                job: row_to_move_job(&row),
                created: false,
            });
        }

        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO move_jobs (
                id, library_item_id, destination_path, destination_key, source_path,
                status, attempt_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'queued', 0, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(library_item_id)
        .bind(destination_path)
        .bind(&key)
        .bind(source_path)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query(&format!("SELECT {MOVE_COLUMNS} FROM move_jobs WHERE id = ?1"))
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Enqueued {
            job: row_to_move_job(&row),
            created: true,
        })
    }

    pub async fn get_move_job(&self, id: &str) -> Result<Option<MoveJob>> {
        let row = sqlx::query(&format!("SELECT {MOVE_COLUMNS} FROM move_jobs WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_move_job))
    }

    /// Move jobs newest first.
    pub async fn list_move_jobs(&self) -> Result<Vec<MoveJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVE_COLUMNS} FROM move_jobs ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_move_job).collect())
    }

    /// Claim the oldest queued move job, incrementing its attempt count.
    pub async fn claim_next_move_job(&self) -> Result<Option<MoveJob>> {
        let now = unix_timestamp();
        let row = sqlx::query(
            r#"
            UPDATE move_jobs
            SET status = 'processing',
                attempt_count = attempt_count + 1,
                updated_at = ?1
            WHERE id = (
                SELECT id FROM move_jobs
                WHERE status = 'queued'
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.get("id");
        self.get_move_job(&id)
            .await?
            .with_context(|| format!("claimed move job {id} vanished"))
            .map(Some)
    }

    pub async fn mark_move_completed(&self, id: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE move_jobs
            SET status = 'completed',
                last_error = NULL,
                completed_at = ?1,
                updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_move_failed(&self, id: &str, error: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE move_jobs
            SET status = 'failed',
                last_error = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn touch_move_job(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE move_jobs
            SET updated_at = ?1
            WHERE id = ?2 AND status = 'processing'
            "#,
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset `processing` move jobs last touched at or before `stale_before`
    /// to `queued`.
    pub async fn recover_move_jobs(&self, stale_before: i64) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE move_jobs
            SET status = 'queued',
                updated_at = ?1
            WHERE status = 'processing'
              AND updated_at <= ?2
            "#,
        )
        .bind(now)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
