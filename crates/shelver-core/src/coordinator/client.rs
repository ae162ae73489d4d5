//! Mapping download-client queue snapshots onto downloads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::library_db::{DownloadMetadata, MetaKey};

use super::DownloadQueueCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientItemStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
}

/// One entry of a client's queue as reported by its gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Client-side id: torrent info hash, NZB id or the client's own item id.
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: ClientItemStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    /// Where the client put the finished files.
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

/// What one `apply_client_queue` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientSyncReport {
    pub progress_updates: u32,
    pub completed: u32,
    pub failed: u32,
    pub jobs_queued: u32,
    pub unmatched: u32,
    /// Completed items whose processing job could not be queued; they stay
    /// open and are tried again on the next sync.
    pub deferred: u32,
}

impl DownloadQueueCoordinator {
    /// Apply a queue snapshot from download client `client_id`.
    ///
    /// Items are matched to downloads by correlation key. A download moves to
    /// Completed exactly once, and only after its processing job (when the
    /// item reports where its files are) has been queued, so a failure in
    /// between leaves the download open for the next sync.
    pub async fn apply_client_queue(
        &self,
        client_id: &str,
        items: &[QueueItem],
    ) -> Result<ClientSyncReport> {
        let mut report = ClientSyncReport::default();
        for item in items {
            let Some(download) = self.db.find_download_by_correlation_key(&item.id).await? else {
                report.unmatched += 1;
                continue;
            };
            if download
                .client_id
                .as_deref()
                .is_some_and(|c| c != client_id)
            {
                report.unmatched += 1;
                continue;
            }
            if download.status.is_terminal() {
                continue;
            }

            match item.status {
                ClientItemStatus::Queued => {}
                ClientItemStatus::Downloading => {
                    let progress = item.progress.unwrap_or(0).min(99);
                    if self.db.update_download_progress(&download.id, progress).await? {
                        report.progress_updates += 1;
                    }
                }
                ClientItemStatus::Completed => {
                    let mut queued = false;
                    if let Some(path) = item.content_path.as_deref() {
                        let path = path.to_string_lossy().into_owned();
                        let target = download.library_item_id.as_deref();
                        match self.queue_completed(&download.id, &path, target).await {
                            Ok(created) => queued = created,
                            Err(e) => {
                                report.deferred += 1;
                                tracing::warn!(
                                    download_id = %download.id,
                                    client_id,
                                    "could not queue processing, will retry on next sync: {e:#}"
                                );
                                continue;
                            }
                        }
                    }
                    if !self.db.mark_download_completed(&download.id).await? {
                        continue;
                    }
                    report.completed += 1;
                    if queued {
                        report.jobs_queued += 1;
                    }
                    tracing::info!(download_id = %download.id, client_id, "download completed");
                }
                ClientItemStatus::Failed => {
                    if self.db.mark_download_failed(&download.id).await? {
                        report.failed += 1;
                        tracing::warn!(download_id = %download.id, client_id, "download failed in client");
                    }
                }
            }
        }
        Ok(report)
    }

    /// Record where the files are and queue processing. Returns whether a
    /// new job was created.
    async fn queue_completed(
        &self,
        download_id: &str,
        content_path: &str,
        library_item_id: Option<&str>,
    ) -> Result<bool> {
        let meta = DownloadMetadata::default().with(MetaKey::ContentPath, content_path);
        self.db.merge_download_metadata(download_id, &meta).await?;
        let enqueued = self
            .enqueue_processing(download_id, content_path, library_item_id)
            .await?;
        Ok(enqueued.created)
    }
}
