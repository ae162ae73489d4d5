//! `shelver retry` – requeue a failed processing job.

use anyhow::{bail, Result};
use shelver_core::coordinator::DownloadQueueCoordinator;
use shelver_core::library_db::RequeueOutcome;

pub async fn run_retry(coordinator: &DownloadQueueCoordinator, id: &str) -> Result<()> {
    match coordinator.retry_failed_job(id).await? {
        RequeueOutcome::Requeued => println!("Job {id} requeued."),
        RequeueOutcome::NotFound => bail!("job {id} not found"),
        RequeueOutcome::NotFailed => bail!("job {id} is not failed"),
        RequeueOutcome::AttemptsExhausted => bail!("job {id} has used all its attempts"),
    }
    Ok(())
}
