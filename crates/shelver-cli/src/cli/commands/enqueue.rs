//! `shelver enqueue` – queue processing for a completed download.

use anyhow::Result;
use shelver_core::coordinator::DownloadQueueCoordinator;
use std::path::Path;

pub async fn run_enqueue(
    coordinator: &DownloadQueueCoordinator,
    download: &str,
    source: &Path,
    item: Option<&str>,
) -> Result<()> {
    let enqueued = coordinator
        .enqueue_processing(download, &source.to_string_lossy(), item)
        .await?;
    if enqueued.created {
        println!("{}", enqueued.job.id);
    } else {
        println!("{} (existing, {})", enqueued.job.id, enqueued.job.status.as_str());
    }
    Ok(())
}
