//! Run one move job (relocating a library item's files).

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::error::FinalizeError;
use crate::finalize::FileMover;
use crate::library_db::MoveJob;

use super::{Heartbeat, JobOutcome, ProcessingJobSupervisor};

impl ProcessingJobSupervisor {
    pub(crate) async fn run_move_job(&self, job: MoveJob) -> Result<JobOutcome> {
        let job_id = job.id.clone();
        tracing::info!(
            job_id = %job_id,
            library_item_id = %job.library_item_id,
            dst = %job.destination_path,
            "move job started"
        );

        let token = self.control.register(&job_id);
        let mover = FileMover::new(self.settings.retry, self.settings.verify_copies);
        let src = PathBuf::from(&job.source_path);
        let dst = PathBuf::from(&job.destination_path);
        let task = tokio::task::spawn_blocking(move || -> Result<(), FinalizeError> {
            if !src.exists() && dst.exists() {
                // Already moved by an earlier attempt.
                return Ok(());
            }
            if src.is_dir() {
                return mover.move_directory(&src, &dst, Some(token.as_ref()));
            }
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(|e| FinalizeError::io(parent, e))?;
            }
            mover.move_file(&src, &dst)
        });
        let result = self
            .with_heartbeat(Heartbeat::Move(&job_id), task)
            .await
            .context("move task join");
        self.control.unregister(&job_id);

        match result? {
            Ok(()) => {
                self.db
                    .set_library_item_path(&job.library_item_id, &job.destination_path)
                    .await?;
                self.db.mark_move_completed(&job_id).await?;
                tracing::info!(job_id = %job_id, "move job completed");
                Ok(JobOutcome::Completed { job_id })
            }
            Err(e) => {
                let error = e.to_string();
                self.db.mark_move_failed(&job_id, &error).await?;
                tracing::warn!(job_id = %job_id, "move job failed: {error}");
                Ok(JobOutcome::Failed { job_id, error })
            }
        }
    }
}
