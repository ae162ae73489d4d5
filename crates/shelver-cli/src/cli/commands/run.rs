//! `shelver run` – process queued jobs.

use anyhow::Result;
use shelver_core::config::ShelverConfig;
use shelver_core::library_db::LibraryDb;
use shelver_core::supervisor::ProcessingJobSupervisor;

pub async fn run_supervisor(
    db: LibraryDb,
    cfg: &ShelverConfig,
    jobs: Option<usize>,
    watch: bool,
) -> Result<()> {
    if cfg.output_path.is_none() {
        tracing::warn!("output_path is not set; only jobs for linked item folders can finish");
    }
    let mut supervisor = ProcessingJobSupervisor::new(db.clone(), cfg);
    if let Some(n) = jobs {
        supervisor = supervisor.with_workers(n);
    }

    if watch {
        let (tx, rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, finishing running jobs");
                let _ = tx.send(true);
            }
        });
        return supervisor.run_until_shutdown(rx).await;
    }

    let (processing, moves) = supervisor.recover_stale().await?;
    if processing + moves > 0 {
        tracing::info!("recovered {} job(s) from previous run", processing + moves);
    }

    let summary = supervisor.run_pending().await?;
    if summary.total() == 0 {
        println!("No queued jobs.");
    } else {
        println!("{} completed, {} failed.", summary.completed, summary.failed);
    }
    Ok(())
}
