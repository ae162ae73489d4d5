//! Run one processing job: list the download's files and finalize them.

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::CompletedFileAction;
use crate::error::FinalizeError;
use crate::finalize::{list_source_files, remove_empty_tree, ImportResult};
use crate::library_db::{JobId, ProcessingJob};

use super::{Heartbeat, ProcessingJobSupervisor};

/// Final state of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { job_id: JobId },
    Failed { job_id: JobId, error: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

fn summarize_failures(results: &[ImportResult]) -> Option<String> {
    let failed: Vec<&ImportResult> = results.iter().filter(|r| !r.success).collect();
    let first = failed.first()?;
    Some(format!(
        "{} of {} files failed; {}: {}",
        failed.len(),
        results.len(),
        first.source.display(),
        first.error.as_deref().unwrap_or("unknown error")
    ))
}

impl ProcessingJobSupervisor {
    /// Runs a claimed job and records the result. Only database errors are
    /// returned as `Err`; everything else ends up in the job's `last_error`.
    pub(crate) async fn run_processing_job(&self, job: ProcessingJob) -> Result<JobOutcome> {
        let job_id = job.id.clone();
        tracing::info!(
            job_id = %job_id,
            download_id = %job.download_id,
            attempt = job.attempt_count,
            "processing job started"
        );

        let token = self.control.register(&job_id);
        let result = self
            .with_heartbeat(Heartbeat::Processing(&job_id), self.finalize_job(&job, token))
            .await;
        self.control.unregister(&job_id);

        match result {
            Ok(final_path) => {
                self.db
                    .set_download_final_path(&job.download_id, &final_path.to_string_lossy())
                    .await?;
                self.db.mark_processing_completed(&job_id).await?;
                tracing::info!(job_id = %job_id, path = %final_path.display(), "processing job completed");
                Ok(JobOutcome::Completed { job_id })
            }
            Err(e) => {
                let error = format!("{e:#}");
                self.db.mark_processing_failed(&job_id, &error).await?;
                tracing::warn!(job_id = %job_id, "processing job failed: {error}");
                Ok(JobOutcome::Failed { job_id, error })
            }
        }
    }

    /// Returns the library path to record on the download.
    async fn finalize_job(
        &self,
        job: &ProcessingJob,
        token: Arc<std::sync::atomic::AtomicBool>,
    ) -> Result<PathBuf> {
        let download = self
            .db
            .get_download(&job.download_id)
            .await?
            .ok_or_else(|| anyhow!("download {} not found", job.download_id))?;

        // Set when an earlier attempt already put the download in the library.
        let finalized = download
            .final_path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| p.exists());

        let target = job
            .target_item_id
            .clone()
            .or_else(|| download.library_item_id.clone());
        let settings = match target.as_deref() {
            Some(item_id) => match self.db.get_library_item_path(item_id).await? {
                Some(base) => Arc::new((*self.settings).clone().with_item_root(item_id, base)),
                None => Arc::clone(&self.settings),
            },
            None => Arc::clone(&self.settings),
        };

        let source = PathBuf::from(&job.source_path);
        let finalizer = self.finalizer.clone();
        let already_done = finalized.is_some();
        let outcome = tokio::task::spawn_blocking(move || -> Result<Option<Vec<ImportResult>>> {
            // A rerun after a crash between the import and the status update
            // finds the source gone, or emptied by a move, with the library
            // copy in place.
            let sources = match list_source_files(&source) {
                Ok(sources) => sources,
                Err(FinalizeError::SourceMissing(_)) if already_done => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if sources.is_empty() && already_done {
                return Ok(None);
            }
            let results = finalizer.import_files(
                &download,
                target.as_deref(),
                &sources,
                &settings,
                Some(token.as_ref()),
            )?;
            let all_moved = settings.action == CompletedFileAction::Move
                && !results.is_empty()
                && results.iter().all(|r| r.success);
            if all_moved && source.is_dir() {
                if let Err(e) = remove_empty_tree(&source) {
                    tracing::warn!(src = %source.display(), "could not remove emptied download: {e}");
                }
            }
            Ok(Some(results))
        })
        .await
        .context("finalize task join")??;

        let Some(results) = outcome else {
            tracing::info!(job_id = %job.id, "source already finalized");
            return finalized.ok_or_else(|| anyhow!("finalized path vanished"));
        };

        if results.is_empty() {
            bail!("no files found in {}", job.source_path);
        }
        if let Some(msg) = summarize_failures(&results) {
            bail!(msg);
        }

        let first = results[0]
            .destination
            .clone()
            .ok_or_else(|| anyhow!("import reported success without a destination"))?;
        if results.len() == 1 {
            return Ok(first);
        }
        Ok(first.parent().map(PathBuf::from).unwrap_or(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, error: Option<&str>) -> ImportResult {
        ImportResult {
            source: PathBuf::from(name),
            destination: None,
            success: error.is_none(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn failures_are_summarized_with_first_error() {
        let all_ok = [result("a", None), result("b", None)];
        assert!(summarize_failures(&all_ok).is_none());

        let mixed = [result("a", None), result("b", Some("disk full")), result("c", Some("x"))];
        assert_eq!(
            summarize_failures(&mixed).unwrap(),
            "2 of 3 files failed; b: disk full"
        );
    }
}
