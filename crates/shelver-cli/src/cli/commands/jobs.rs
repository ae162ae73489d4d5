//! `shelver job` / `shelver jobs` – inspect processing jobs.

use anyhow::{bail, Result};
use shelver_core::coordinator::DownloadQueueCoordinator;
use shelver_core::library_db::{ProcessingJob, ProcessingJobStatus};

const STATUSES: [ProcessingJobStatus; 5] = [
    ProcessingJobStatus::Pending,
    ProcessingJobStatus::Processing,
    ProcessingJobStatus::Completed,
    ProcessingJobStatus::Failed,
    ProcessingJobStatus::Retry,
];

fn parse_status(s: &str) -> Result<ProcessingJobStatus> {
    let s = s.trim().to_ascii_lowercase();
    match STATUSES.iter().find(|st| st.as_str() == s) {
        Some(st) => Ok(*st),
        None => bail!("unknown status {s:?} (expected pending, processing, completed, failed or retry)"),
    }
}

pub async fn run_job(coordinator: &DownloadQueueCoordinator, id: &str) -> Result<()> {
    let Some(job) = coordinator.get_job(id).await? else {
        bail!("job {id} not found");
    };
    println!("id:         {}", job.id);
    println!("download:   {}", job.download_id);
    println!("source:     {}", job.source_path);
    println!("item:       {}", job.target_item_id.as_deref().unwrap_or("-"));
    println!("status:     {}", job.status.as_str());
    println!("attempts:   {}", job.attempt_count);
    println!("created:    {}", job.created_at);
    println!(
        "completed:  {}",
        job.completed_at.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
    );
    if let Some(err) = &job.last_error {
        println!("last error: {err}");
    }
    Ok(())
}

pub async fn run_jobs(
    coordinator: &DownloadQueueCoordinator,
    download: Option<&str>,
    status: Option<&str>,
) -> Result<()> {
    let status = status.map(parse_status).transpose()?;
    let jobs: Vec<ProcessingJob> = match download {
        Some(d) => coordinator
            .get_jobs_for_download(d)
            .await?
            .into_iter()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .collect(),
        None => coordinator.db().list_processing_jobs(status).await?,
    };
    if jobs.is_empty() {
        println!("No processing jobs.");
        return Ok(());
    }
    println!("{:<36} {:<11} {:<8} {}", "ID", "STATUS", "ATTEMPTS", "SOURCE");
    for j in jobs {
        println!(
            "{:<36} {:<11} {:<8} {}",
            j.id,
            j.status.as_str(),
            j.attempt_count,
            j.source_path
        );
    }
    Ok(())
}
