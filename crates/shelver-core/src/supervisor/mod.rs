//! Background workers that drain processing and move jobs.
//!
//! Jobs are claimed one at a time from the database (the claim increments the
//! attempt count before any work starts) and run with up to `workers` jobs in
//! flight. A job that fails is marked Failed with its error; requeueing is up
//! to the caller. While a job runs its row is touched every third of
//! `stale_after`, so recovery in another process can tell it from a job
//! stranded by a crash.

mod moves;
mod run;

pub use run::JobOutcome;

use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ShelverConfig;
use crate::control::JobControl;
use crate::coordinator::recover_stale;
use crate::finalize::{FileFinalizer, ImportSettings};
use crate::library_db::LibraryDb;

/// Counts from one `run_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u32,
    pub failed: u32,
}

impl RunSummary {
    pub fn total(&self) -> u32 {
        self.completed + self.failed
    }

    fn record(&mut self, outcome: &JobOutcome) {
        if outcome.is_success() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Clone)]
pub struct ProcessingJobSupervisor {
    db: LibraryDb,
    finalizer: FileFinalizer,
    settings: Arc<ImportSettings>,
    control: Arc<JobControl>,
    workers: usize,
    poll_interval: Duration,
    stale_after: Duration,
}

#[derive(Clone, Copy)]
enum Heartbeat<'a> {
    Processing(&'a str),
    Move(&'a str),
}

enum Work {
    Processing(crate::library_db::ProcessingJob),
    Move(crate::library_db::MoveJob),
}

impl ProcessingJobSupervisor {
    pub fn new(db: LibraryDb, cfg: &ShelverConfig) -> Self {
        Self {
            db,
            finalizer: FileFinalizer::default(),
            settings: Arc::new(ImportSettings::from_config(cfg)),
            control: Arc::new(JobControl::new()),
            workers: cfg.workers.count.max(1),
            poll_interval: Duration::from_millis(cfg.workers.poll_interval_ms.max(10)),
            stale_after: cfg.workers.stale_after(),
        }
    }

    pub fn with_finalizer(mut self, finalizer: FileFinalizer) -> Self {
        self.finalizer = finalizer;
        self
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Abort tokens of running jobs.
    pub fn control(&self) -> Arc<JobControl> {
        Arc::clone(&self.control)
    }

    /// Run queued jobs until none are left, keeping up to `workers` in flight.
    /// Processing jobs are claimed before move jobs.
    pub async fn run_pending(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut join_set = JoinSet::new();

        loop {
            while join_set.len() < self.workers {
                let Some(work) = self.claim_next().await? else {
                    break;
                };
                let this = self.clone();
                join_set.spawn(async move {
                    match work {
                        Work::Processing(job) => this.run_processing_job(job).await,
                        Work::Move(job) => this.run_move_job(job).await,
                    }
                });
            }

            if join_set.is_empty() {
                break;
            }

            let Some(res) = join_set.join_next().await else {
                break;
            };
            let outcome = res.map_err(|e| anyhow!("job task join: {}", e))??;
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn claim_next(&self) -> Result<Option<Work>> {
        if let Some(job) = self.db.claim_next_processing_job().await? {
            return Ok(Some(Work::Processing(job)));
        }
        Ok(self.db.claim_next_move_job().await?.map(Work::Move))
    }

    /// Requeue jobs stranded in `processing` whose heartbeat is older than
    /// `stale_after`. Returns (processing jobs, move jobs) recovered.
    pub async fn recover_stale(&self) -> Result<(u64, u64)> {
        recover_stale(&self.db, self.stale_after).await
    }

    /// Drive `work` to completion, touching the job row so it is not
    /// mistaken for a stranded one.
    async fn with_heartbeat<T>(&self, job: Heartbeat<'_>, work: impl Future<Output = T>) -> T {
        let every = (self.stale_after / 3).max(Duration::from_secs(1));
        let mut beat = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        tokio::pin!(work);
        loop {
            tokio::select! {
                out = &mut work => return out,
                _ = beat.tick() => {
                    let touched = match job {
                        Heartbeat::Processing(id) => self.db.touch_processing_job(id).await,
                        Heartbeat::Move(id) => self.db.touch_move_job(id).await,
                    };
                    if let Err(e) = touched {
                        tracing::warn!("job heartbeat failed: {e:#}");
                    }
                }
            }
        }
    }

    /// Recover stranded jobs, then keep draining the queue until `shutdown`
    /// flips to true. Running jobs finish before this returns.
    pub async fn run_until_shutdown(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.recover_stale().await?;
        tracing::info!(workers = self.workers, "supervisor started");

        while !*shutdown.borrow() {
            let summary = self.run_pending().await?;
            if summary.total() > 0 {
                tracing::info!(
                    completed = summary.completed,
                    failed = summary.failed,
                    "queue drained"
                );
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("supervisor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
