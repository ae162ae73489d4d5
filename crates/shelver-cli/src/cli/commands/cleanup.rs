//! `shelver cleanup` – delete old finished jobs.

use anyhow::Result;
use shelver_core::coordinator::DownloadQueueCoordinator;
use std::time::Duration;

pub async fn run_cleanup(coordinator: &DownloadQueueCoordinator, days: u64) -> Result<()> {
    let retention = Duration::from_secs(days.saturating_mul(86_400));
    let removed = coordinator.cleanup_old_jobs(retention).await?;
    println!("Removed {removed} job(s) finished more than {days} day(s) ago.");
    Ok(())
}
