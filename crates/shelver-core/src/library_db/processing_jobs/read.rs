//! Processing job reads.

use anyhow::Result;
use sqlx::Row;

use super::super::db::LibraryDb;
use super::super::types::{ProcessingJob, ProcessingJobStatus, QueueStats};
use super::{row_to_job, JOB_COLUMNS};

impl LibraryDb {
    pub async fn get_processing_job(&self, id: &str) -> Result<Option<ProcessingJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_job))
    }

    /// Every job for a download, oldest first.
    pub async fn processing_jobs_for_download(&self, download_id: &str) -> Result<Vec<ProcessingJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE download_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(download_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_job).collect())
    }

    /// Jobs newest first, optionally filtered by status.
    pub async fn list_processing_jobs(
        &self,
        status: Option<ProcessingJobStatus>,
    ) -> Result<Vec<ProcessingJob>> {
        let rows = match status {
            Some(s) => {
                sqlx::query(&format!(
                    "SELECT {JOB_COLUMNS} FROM processing_jobs WHERE status = ?1 \
                     ORDER BY created_at DESC, rowid DESC"
                ))
                .bind(s.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {JOB_COLUMNS} FROM processing_jobs ORDER BY created_at DESC, rowid DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.iter().map(row_to_job).collect())
    }

    /// Counts by status plus the age of the oldest waiting job.
    pub async fn processing_queue_stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n, MIN(created_at) AS oldest
            FROM processing_jobs
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            let n = n.max(0) as u64;
            match ProcessingJobStatus::from_str(&status) {
                ProcessingJobStatus::Pending => {
                    stats.pending = n;
                    stats.oldest_pending_at = row.get("oldest");
                }
                ProcessingJobStatus::Processing => stats.processing = n,
                ProcessingJobStatus::Retry => stats.retry = n,
                ProcessingJobStatus::Completed => stats.completed = n,
                ProcessingJobStatus::Failed => stats.failed += n,
            }
        }
        Ok(stats)
    }
}
