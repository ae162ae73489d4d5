//! Processing job writes: create-or-reuse, claim, completion, failure, requeue.

use anyhow::{Context, Result};
use sqlx::Row;

use super::super::db::{new_id, unix_timestamp, LibraryDb};
use super::super::types::{Enqueued, ProcessingJob, ProcessingJobStatus, RequeueOutcome};
use super::{row_to_job, JOB_COLUMNS};

impl LibraryDb {
    /// Return the active job for `download_id`, or a job completed within the
    /// last `cooldown_secs`, or insert a new pending job. The read and the
    /// insert run in one transaction.
    pub async fn create_or_reuse_processing_job(
        &self,
        download_id: &str,
        source_path: &str,
        target_item_id: Option<&str>,
        cooldown_secs: u64,
    ) -> Result<Enqueued<ProcessingJob>> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;

        let active = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM processing_jobs \
             WHERE download_id = ?1 AND status IN ('pending', 'processing', 'retry') \
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(download_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = active {
            tx.commit().await?;
            return Ok(Enqueued {
                job: row_to_job(&row),
                created: false,
            });
        }

        let cutoff = now.saturating_sub(cooldown_secs.min(i64::MAX as u64) as i64);
        let recent = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM processing_jobs \
             WHERE download_id = ?1 AND status = 'completed' AND completed_at >= ?2 \
             ORDER BY completed_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(download_id)
        .bind(cutoff)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = recent {
            tx.commit().await?;
            return Ok(Enqueued {
                job: row_to_job(&row),
                created: false,
            });
        }

        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO processing_jobs (
                id, download_id, source_path, target_item_id, status,
                attempt_count, last_error, created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, 'pending', 0, NULL, ?5, ?6, NULL)
            "#,
        )
        .bind(&id)
        .bind(download_id)
        .bind(source_path)
        .bind(target_item_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE id = ?1"
        ))
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Enqueued {
            job: row_to_job(&row),
            created: true,
        })
    }

    /// Atomically claim the oldest Pending or Retry job: set it to Processing
    /// and increment its attempt count before any work is done. Returns None
    /// when nothing is waiting.
    pub async fn claim_next_processing_job(&self) -> Result<Option<ProcessingJob>> {
        let now = unix_timestamp();
        let row = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'processing',
                attempt_count = attempt_count + 1,
                updated_at = ?1
            WHERE id = (
                SELECT id FROM processing_jobs
                WHERE status IN ('pending', 'retry')
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
        self.get_processing_job(&id)
            .await?
            .with_context(|| format!("claimed job {id} vanished"))
            .map(Some)
    }

    /// Mark a job Completed and stamp `completed_at` (the cooldown anchor).
    pub async fn mark_processing_completed(&self, id: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE processing_jobs
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

    /// Mark a job Failed with a user-visible error. The attempt count is kept.
    pub async fn mark_processing_failed(&self, id: &str, error: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE processing_jobs
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

    /// Move a Failed job to Retry so a worker picks it up again, unless it
    /// has already used `max_attempts` attempts.
    pub async fn requeue_failed_job(&self, id: &str, max_attempts: u32) -> Result<RequeueOutcome> {
        let Some(job) = self.get_processing_job(id).await? else {
            return Ok(RequeueOutcome::NotFound);
        };
        if job.status != ProcessingJobStatus::Failed {
            return Ok(RequeueOutcome::NotFailed);
        }
        if job.attempt_count >= max_attempts {
            return Ok(RequeueOutcome::AttemptsExhausted);
        }
        let now = unix_timestamp();
        // The partial unique index rejects this if another job became active meanwhile.
        let r = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'retry',
                updated_at = ?1
            WHERE id = ?2
              AND status = 'failed'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("requeue failed job")?;
        Ok(if r.rows_affected() == 1 {
            RequeueOutcome::Requeued
        } else {
            RequeueOutcome::NotFailed
        })
    }

    /// Refresh `updated_at` of a running job so recovery leaves it alone.
    pub async fn touch_processing_job(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE processing_jobs
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

    /// Reset jobs stuck in `processing` whose last heartbeat is at or before
    /// `stale_before` back to `pending` (e.g. after a crash). Jobs a live
    /// worker keeps touching are left alone. Attempt counts are preserved.
    /// Returns the number of jobs reset.
    pub async fn recover_processing_jobs(&self, stale_before: i64) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'pending',
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

    /// Overwrite `completed_at`. Used by maintenance tooling and tests that
    /// need to age a job past the cooldown.
    pub async fn set_processing_job_completed_at(&self, id: &str, completed_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE processing_jobs
            SET completed_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete Completed/Failed jobs last touched before `older_than`.
    /// Active jobs are never removed. Returns the number of rows deleted.
    pub async fn delete_finished_processing_jobs(&self, older_than: i64) -> Result<u64> {
        let r = sqlx::query(
            r#"
            DELETE FROM processing_jobs
            WHERE status IN ('completed', 'failed')
              AND COALESCE(completed_at, updated_at) < ?1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
