//! Download queue coordinator: canonical download state and idempotent
//! processing-job creation.
//!
//! Create-or-reuse decisions for a download are serialized twice: by a
//! per-key async lock inside the process and by a transaction plus a partial
//! unique index in the database across processes.

mod client;
mod locks;

pub use client::{ClientItemStatus, ClientSyncReport, QueueItem};
pub use locks::KeyLocks;

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ShelverConfig;
use crate::library_db::{
    unix_timestamp, Download, Enqueued, JobId, LibraryDb, MoveJob, NewDownload, ProcessingJob,
    QueueStats, RequeueOutcome,
};

#[derive(Clone)]
pub struct DownloadQueueCoordinator {
    db: LibraryDb,
    cooldown: Duration,
    max_job_attempts: u32,
    stale_after: Duration,
    locks: Arc<KeyLocks>,
}

impl DownloadQueueCoordinator {
    pub fn new(db: LibraryDb, cfg: &ShelverConfig) -> Self {
        Self {
            db,
            cooldown: cfg.cooldown(),
            max_job_attempts: cfg.retry_config().max_job_attempts,
            stale_after: cfg.workers.stale_after(),
            locks: Arc::new(KeyLocks::new()),
        }
    }

    pub fn db(&self) -> &LibraryDb {
        &self.db
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record an accepted candidate. Registering the same correlation key
    /// twice returns the existing download.
    pub async fn register_download(&self, new: &NewDownload) -> Result<Download> {
        let download = self.db.insert_download(new).await?;
        tracing::info!(download_id = %download.id, title = %download.title, "download registered");
        Ok(download)
    }

    pub async fn get_download(&self, id: &str) -> Result<Option<Download>> {
        self.db.get_download(id).await
    }

    /// Return the id of the job that will process `download_id`: an active
    /// job, a job completed within the cooldown, or a newly created one.
    pub async fn queue_download_processing(
        &self,
        download_id: &str,
        source_path: &str,
        target_item_id: Option<&str>,
    ) -> Result<JobId> {
        Ok(self
            .enqueue_processing(download_id, source_path, target_item_id)
            .await?
            .job
            .id)
    }

    /// Same as `queue_download_processing`, also reporting whether the job is new.
    pub async fn enqueue_processing(
        &self,
        download_id: &str,
        source_path: &str,
        target_item_id: Option<&str>,
    ) -> Result<Enqueued<ProcessingJob>> {
        if source_path.trim().is_empty() {
            bail!("empty source path for download {download_id}");
        }
        let _guard = self.locks.lock(download_id).await;
        if self.db.get_download(download_id).await?.is_none() {
            bail!("unknown download {download_id}");
        }
        let enqueued = self
            .db
            .create_or_reuse_processing_job(
                download_id,
                source_path,
                target_item_id,
                self.cooldown.as_secs(),
            )
            .await?;
        if enqueued.created {
            tracing::info!(job_id = %enqueued.job.id, download_id, "processing job queued");
        } else {
            tracing::debug!(
                job_id = %enqueued.job.id,
                download_id,
                status = enqueued.job.status.as_str(),
                "reusing existing processing job"
            );
        }
        Ok(enqueued)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<ProcessingJob>> {
        self.db.get_processing_job(job_id).await
    }

    /// Jobs for a download, oldest first.
    pub async fn get_jobs_for_download(&self, download_id: &str) -> Result<Vec<ProcessingJob>> {
        self.db.processing_jobs_for_download(download_id).await
    }

    /// Caller-driven requeue of a failed job (Failed -> Retry).
    pub async fn retry_failed_job(&self, job_id: &str) -> Result<RequeueOutcome> {
        let Some(job) = self.db.get_processing_job(job_id).await? else {
            return Ok(RequeueOutcome::NotFound);
        };
        let _guard = self.locks.lock(&job.download_id).await;
        let outcome = self
            .db
            .requeue_failed_job(job_id, self.max_job_attempts)
            .await
            .map_err(|e| anyhow!("requeue {job_id}: {e:#} (another job may be active)"))?;
        tracing::info!(job_id, outcome = ?outcome, "retry requested");
        Ok(outcome)
    }

    /// Queue moving a library item's files, reusing an active job for the
    /// same item and destination.
    pub async fn enqueue_move(
        &self,
        library_item_id: &str,
        destination: &str,
        source: &str,
    ) -> Result<Enqueued<MoveJob>> {
        if destination.trim().is_empty() || source.trim().is_empty() {
            bail!("move needs both a source and a destination");
        }
        let _guard = self.locks.lock(&format!("move:{library_item_id}")).await;
        let enqueued = self
            .db
            .enqueue_move_job(library_item_id, destination, source)
            .await?;
        if enqueued.created {
            tracing::info!(job_id = %enqueued.job.id, library_item_id, "move job queued");
        }
        Ok(enqueued)
    }

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        self.db.processing_queue_stats().await
    }

    /// Delete completed and failed jobs that finished more than `retention`
    /// ago. Active jobs are never touched.
    pub async fn cleanup_old_jobs(&self, retention: Duration) -> Result<u64> {
        let cutoff = unix_timestamp().saturating_sub(retention.as_secs().min(i64::MAX as u64) as i64);
        let removed = self.db.delete_finished_processing_jobs(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "old processing jobs cleaned up");
        }
        Ok(removed)
    }

    /// Reset jobs left in processing by a crashed run. Jobs whose worker
    /// touched them within `workers.stale_after_secs` are still owned and
    /// stay put. Returns (processing jobs, move jobs) recovered.
    pub async fn recover(&self) -> Result<(u64, u64)> {
        recover_stale(&self.db, self.stale_after).await
    }
}

/// Requeue `processing` jobs whose heartbeat is older than `stale_after`.
pub(crate) async fn recover_stale(db: &LibraryDb, stale_after: Duration) -> Result<(u64, u64)> {
    let cutoff = unix_timestamp().saturating_sub(stale_after.as_secs().min(i64::MAX as u64) as i64);
    let processing = db.recover_processing_jobs(cutoff).await?;
    let moves = db.recover_move_jobs(cutoff).await?;
    if processing + moves > 0 {
        tracing::warn!(processing, moves, "recovered stranded jobs");
    }
    Ok((processing, moves))
}
