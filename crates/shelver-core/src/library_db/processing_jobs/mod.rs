//! Processing job CRUD: reads in `read`, transitions in `write`.

mod read;
mod write;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::types::{ProcessingJob, ProcessingJobStatus};

pub(super) const JOB_COLUMNS: &str = "id, download_id, source_path, target_item_id, status, \
     attempt_count, last_error, created_at, updated_at, completed_at";

pub(super) fn row_to_job(row: &SqliteRow) -> ProcessingJob {
    let status: String = row.get("status");
    let attempt_count: i64 = row.get("attempt_count");
    ProcessingJob {
        id: row.get("id"),
        download_id: row.get("download_id"),
        source_path: row.get("source_path"),
        target_item_id: row.get("target_item_id"),
        status: ProcessingJobStatus::from_str(&status),
        attempt_count: attempt_count.max(0) as u32,
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}
