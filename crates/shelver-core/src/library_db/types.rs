//! Types stored in the library database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Job identifier (UUID v4 string).
pub type JobId = String;

/// Download identifier (UUID v4 string).
pub type DownloadId = String;

/// Download lifecycle. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => DownloadStatus::Queued,
            "downloading" => DownloadStatus::Downloading,
            "completed" => DownloadStatus::Completed,
            _ => DownloadStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

/// Closed set of metadata keys a download may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetaKey {
    /// BitTorrent info-hash reported by torrent clients.
    TorrentHash,
    /// Usenet client job id.
    NzbId,
    /// Opaque id for clients with neither of the above.
    ClientItemId,
    Author,
    Series,
    SeriesNumber,
    Year,
    BookTitle,
    /// Directory or file the client finished writing to.
    ContentPath,
}

impl MetaKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MetaKey::TorrentHash => "TorrentHash",
            MetaKey::NzbId => "NzbId",
            MetaKey::ClientItemId => "ClientItemId",
            MetaKey::Author => "Author",
            MetaKey::Series => "Series",
            MetaKey::SeriesNumber => "SeriesNumber",
            MetaKey::Year => "Year",
            MetaKey::BookTitle => "BookTitle",
            MetaKey::ContentPath => "ContentPath",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        [
            MetaKey::TorrentHash,
            MetaKey::NzbId,
            MetaKey::ClientItemId,
            MetaKey::Author,
            MetaKey::Series,
            MetaKey::SeriesNumber,
            MetaKey::Year,
            MetaKey::BookTitle,
            MetaKey::ContentPath,
        ]
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

/// Metadata map, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadMetadata(BTreeMap<MetaKey, String>);

impl DownloadMetadata {
    pub fn get(&self, key: MetaKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: MetaKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn with(mut self, key: MetaKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Stable key used to match client queue items: torrent hash (lowercase),
    /// then NZB id, then the client's own item id. Never the title.
    pub fn correlation_key(&self) -> Option<String> {
        if let Some(hash) = self.get(MetaKey::TorrentHash).filter(|h| !h.trim().is_empty()) {
            return Some(hash.trim().to_ascii_lowercase());
        }
        [MetaKey::NzbId, MetaKey::ClientItemId]
            .into_iter()
            .filter_map(|k| self.get(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Fields supplied when a candidate is accepted and handed to a client.
#[derive(Debug, Clone, Default)]
pub struct NewDownload {
    pub title: String,
    pub library_item_id: Option<String>,
    pub client_id: Option<String>,
    pub total_size: Option<i64>,
    pub metadata: DownloadMetadata,
}

#[derive(Debug, Clone)]
pub struct Download {
    pub id: DownloadId,
    pub title: String,
    pub library_item_id: Option<String>,
    pub client_id: Option<String>,
    pub status: DownloadStatus,
    /// 0-100.
    pub progress: u8,
    pub total_size: Option<i64>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Library path of the last finalized file.
    pub final_path: Option<String>,
    pub metadata: DownloadMetadata,
}

/// Processing job lifecycle: Pending -> Processing -> Completed | Failed,
/// and Failed -> Retry -> Processing when a caller requeues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retry,
}

impl ProcessingJobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingJobStatus::Pending => "pending",
            ProcessingJobStatus::Processing => "processing",
            ProcessingJobStatus::Completed => "completed",
            ProcessingJobStatus::Failed => "failed",
            ProcessingJobStatus::Retry => "retry",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => ProcessingJobStatus::Pending,
            "processing" => ProcessingJobStatus::Processing,
            "completed" => ProcessingJobStatus::Completed,
            "retry" => ProcessingJobStatus::Retry,
            _ => ProcessingJobStatus::Failed,
        }
    }

    /// Pending, Processing and Retry count against the one-active-job rule.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ProcessingJobStatus::Pending
                | ProcessingJobStatus::Processing
                | ProcessingJobStatus::Retry
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub id: JobId,
    pub download_id: DownloadId,
    pub source_path: String,
    pub target_item_id: Option<String>,
    pub status: ProcessingJobStatus,
    /// Incremented when a worker claims the job, before any work happens.
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

/// Move job lifecycle: Queued -> Processing -> Completed | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl MoveJobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveJobStatus::Queued => "queued",
            MoveJobStatus::Processing => "processing",
            MoveJobStatus::Completed => "completed",
            MoveJobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => MoveJobStatus::Queued,
            "processing" => MoveJobStatus::Processing,
            "completed" => MoveJobStatus::Completed,
            _ => MoveJobStatus::Failed,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, MoveJobStatus::Queued | MoveJobStatus::Processing)
    }
}

#[derive(Debug, Clone)]
pub struct MoveJob {
    pub id: JobId,
    pub library_item_id: String,
    pub destination_path: String,
    pub source_path: String,
    pub status: MoveJobStatus,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

/// Result of a create-or-reuse call.
#[derive(Debug, Clone)]
pub struct Enqueued<T> {
    pub job: T,
    /// False when an existing job was handed back.
    pub created: bool,
}

/// Processing queue counts, for `shelver stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub retry: u64,
    pub completed: u64,
    pub failed: u64,
    pub oldest_pending_at: Option<i64>,
}

/// Outcome of asking to requeue a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    Requeued,
    NotFailed,
    AttemptsExhausted,
    NotFound,
}
