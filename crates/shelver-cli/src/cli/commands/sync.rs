//! `shelver sync` – apply a download client's queue snapshot.

use anyhow::{Context, Result};
use shelver_core::coordinator::{DownloadQueueCoordinator, QueueItem};
use std::path::Path;

pub async fn run_sync(coordinator: &DownloadQueueCoordinator, client: &str, path: &Path) -> Result<()> {
    let data = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let items: Vec<QueueItem> =
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    let report = coordinator.apply_client_queue(client, &items).await?;
    println!(
        "{} item(s): {} progress, {} completed, {} failed, {} job(s) queued, {} unmatched, {} deferred",
        items.len(),
        report.progress_updates,
        report.completed,
        report.failed,
        report.jobs_queued,
        report.unmatched,
        report.deferred
    );
    Ok(())
}
