//! `shelver move` – queue relocating a library item.

use anyhow::Result;
use shelver_core::coordinator::DownloadQueueCoordinator;
use std::path::Path;

pub async fn run_move(
    coordinator: &DownloadQueueCoordinator,
    item: &str,
    destination: &Path,
    source: &Path,
) -> Result<()> {
    let enqueued = coordinator
        .enqueue_move(item, &destination.to_string_lossy(), &source.to_string_lossy())
        .await?;
    if enqueued.created {
        println!("{}", enqueued.job.id);
    } else {
        println!("{} (already queued)", enqueued.job.id);
    }
    Ok(())
}
