//! `shelver stats` – processing queue counts.

use anyhow::Result;
use shelver_core::coordinator::DownloadQueueCoordinator;
use shelver_core::library_db::unix_timestamp;

pub async fn run_stats(coordinator: &DownloadQueueCoordinator) -> Result<()> {
    let stats = coordinator.queue_stats().await?;
    println!("pending:    {}", stats.pending);
    println!("processing: {}", stats.processing);
    println!("retry:      {}", stats.retry);
    println!("completed:  {}", stats.completed);
    println!("failed:     {}", stats.failed);
    if let Some(oldest) = stats.oldest_pending_at {
        println!("oldest pending: {}s ago", unix_timestamp().saturating_sub(oldest));
    }
    Ok(())
}
