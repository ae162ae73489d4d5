//! CLI for the shelver library finalization pipeline.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shelver_core::config;
use shelver_core::coordinator::DownloadQueueCoordinator;
use shelver_core::library_db::LibraryDb;
use std::path::PathBuf;

use commands::{
    run_add, run_cleanup, run_enqueue, run_item, run_job, run_jobs, run_move, run_name, run_rank,
    run_retry, run_stats, run_supervisor, run_sync, AddArgs,
};

/// Top-level CLI for shelver.
#[derive(Debug, Parser)]
#[command(name = "shelver")]
#[command(about = "shelver: finalize completed audiobook downloads into a library", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Register an accepted download.
    Add(AddArgs),

    /// Apply a download client's queue snapshot (JSON list of queue items).
    Sync {
        /// Download client identifier.
        client: String,
        /// Path to the JSON snapshot.
        path: PathBuf,
    },

    /// Queue processing for a completed download (returns the job id).
    Enqueue {
        /// Download identifier.
        download: String,
        /// File or directory holding the downloaded files.
        source: PathBuf,
        /// Library item the files belong to.
        #[arg(long, value_name = "ID")]
        item: Option<String>,
    },

    /// Show one processing job.
    Job {
        /// Job identifier.
        id: String,
    },

    /// List processing jobs.
    Jobs {
        /// Only jobs of this download.
        #[arg(long, value_name = "ID")]
        download: Option<String>,
        /// Only jobs in this status (pending, processing, completed, failed, retry).
        #[arg(long)]
        status: Option<String>,
    },

    /// Process queued jobs.
    Run {
        /// Run up to N jobs concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Keep polling for new jobs until interrupted.
        #[arg(long)]
        watch: bool,
    },

    /// Requeue a failed processing job.
    Retry {
        /// Job identifier.
        id: String,
    },

    /// Queue moving a library item's files to a new location.
    Move {
        /// Library item identifier.
        item: String,
        /// Destination directory.
        destination: PathBuf,
        /// Current location.
        source: PathBuf,
    },

    /// Show a library item's folder, or bind it with a path.
    Item {
        /// Library item identifier.
        id: String,
        /// Folder the item's files live in.
        path: Option<PathBuf>,
    },

    /// Show processing queue counts.
    Stats,

    /// Delete finished jobs older than the retention period.
    Cleanup {
        /// Retention in days.
        #[arg(long, default_value = "30", value_name = "DAYS")]
        days: u64,
    },

    /// Score and rank candidates from a JSON file.
    Rank {
        /// Path to a JSON array of candidates.
        path: PathBuf,
        /// Print the ranking as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Preview the library path a naming pattern produces.
    Name {
        /// Pattern, e.g. "{Author}/{Series}/{Title}" (default from config).
        #[arg(long)]
        pattern: Option<String>,
        /// Variable binding, e.g. --var Author="Frank Herbert". Repeatable.
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// File extension to append.
        #[arg(long)]
        ext: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        // Commands that never touch the database.
        match &cli.command {
            CliCommand::Rank { path, json } => return run_rank(&cfg, path, *json),
            CliCommand::Name { pattern, vars, ext } => {
                return run_name(&cfg, pattern.as_deref(), vars, ext.as_deref());
            }
            _ => {}
        }

        let db = LibraryDb::open_default().await?;
        let coordinator = DownloadQueueCoordinator::new(db.clone(), &cfg);

        match cli.command {
            CliCommand::Add(args) => run_add(&coordinator, args).await?,
            CliCommand::Sync { client, path } => run_sync(&coordinator, &client, &path).await?,
            CliCommand::Enqueue {
                download,
                source,
                item,
            } => run_enqueue(&coordinator, &download, &source, item.as_deref()).await?,
            CliCommand::Job { id } => run_job(&coordinator, &id).await?,
            CliCommand::Jobs { download, status } => {
                run_jobs(&coordinator, download.as_deref(), status.as_deref()).await?;
            }
            CliCommand::Run { jobs, watch } => run_supervisor(db, &cfg, jobs, watch).await?,
            CliCommand::Retry { id } => run_retry(&coordinator, &id).await?,
            CliCommand::Move {
                item,
                destination,
                source,
            } => run_move(&coordinator, &item, &destination, &source).await?,
            CliCommand::Item { id, path } => run_item(&db, &id, path.as_deref()).await?,
            CliCommand::Stats => run_stats(&coordinator).await?,
            CliCommand::Cleanup { days } => run_cleanup(&coordinator, days).await?,
            CliCommand::Rank { .. } | CliCommand::Name { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
