use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::{CompletedFileAction, NamingConfig};
use crate::coordinator::DownloadQueueCoordinator;
use crate::library_db::db::{open_memory, unix_timestamp};
use crate::library_db::{
    DownloadMetadata, MetaKey, MoveJobStatus, NewDownload, ProcessingJobStatus, RequeueOutcome,
};
use crate::metadata::{FileMetadata, MetadataError, MetadataExtractor};
use crate::retry::RetryPolicy;

struct NoTags;

impl MetadataExtractor for NoTags {
    fn extract(&self, _path: &Path) -> Result<FileMetadata, MetadataError> {
        Ok(FileMetadata::default())
    }
}

fn settings(root: Option<&Path>, action: CompletedFileAction) -> ImportSettings {
    ImportSettings {
        output_root: root.map(Path::to_path_buf),
        action,
        naming: NamingConfig {
            file_pattern: "{Author}/{Title}/{Title} - {ChapterNumber:00}".to_string(),
            ..NamingConfig::default()
        },
        verify_copies: true,
        retry: RetryPolicy::immediate(2),
        item_roots: Default::default(),
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    downloads: PathBuf,
    library: PathBuf,
    coordinator: DownloadQueueCoordinator,
    supervisor: ProcessingJobSupervisor,
}

async fn fixture(with_root: bool) -> Fixture {
    fixture_with(with_root, CompletedFileAction::Move).await
}

async fn fixture_with(with_root: bool, action: CompletedFileAction) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let downloads = tmp.path().join("downloads");
    let library = tmp.path().join("library");
    let db = open_memory().await.unwrap();
    let mut cfg = ShelverConfig::default();
    cfg.workers.poll_interval_ms = 20;
    // Nothing runs concurrently in these tests; every processing row is stale.
    cfg.workers.stale_after_secs = 0;
    let coordinator = DownloadQueueCoordinator::new(db.clone(), &cfg);
    let supervisor = ProcessingJobSupervisor::new(db, &cfg)
        .with_finalizer(FileFinalizer::new(Arc::new(NoTags)))
        .with_settings(settings(with_root.then_some(library.as_path()), action));
    Fixture {
        _tmp: tmp,
        downloads,
        library,
        coordinator,
        supervisor,
    }
}

fn dune(hash: &str) -> NewDownload {
    NewDownload {
        title: "Frank Herbert - Dune".to_string(),
        client_id: Some("qbit".to_string()),
        metadata: DownloadMetadata::default()
            .with(MetaKey::TorrentHash, hash)
            .with(MetaKey::Author, "Frank Herbert")
            .with(MetaKey::BookTitle, "Dune"),
        ..Default::default()
    }
}

/// Put a job back into `processing`, as if its worker died mid-run.
async fn strand(f: &Fixture, job_id: &str) {
    sqlx::query("UPDATE processing_jobs SET status = 'processing' WHERE id = ?1")
        .bind(job_id)
        .execute(&f.coordinator.db().pool)
        .await
        .unwrap();
}

fn library_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn book_dir(root: &Path) -> PathBuf {
    let dir = root.join("Dune");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("01.mp3"), b"chapter one").unwrap();
    fs::write(dir.join("02.mp3"), b"chapter two").unwrap();
    dir
}

#[tokio::test]
async fn pending_job_is_finalized_and_completed() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h1")).await.unwrap();
    let src = book_dir(&f.downloads);
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), None)
        .await
        .unwrap();

    let summary = f.supervisor.run_pending().await.unwrap();
    assert_eq!(summary, RunSummary { completed: 1, failed: 0 });

    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Completed);
    assert_eq!(job.attempt_count, 1);
    assert!(job.completed_at.is_some());
    assert!(job.last_error.is_none());

    let book = f.library.join("Frank Herbert").join("Dune");
    assert_eq!(fs::read(book.join("Dune - 01.mp3")).unwrap(), b"chapter one");
    assert_eq!(fs::read(book.join("Dune - 02.mp3")).unwrap(), b"chapter two");
    assert!(!src.exists(), "emptied download folder is removed");

    let download = f.coordinator.get_download(&d.id).await.unwrap().unwrap();
    assert_eq!(download.final_path, Some(book.to_string_lossy().into_owned()));

    assert_eq!(f.supervisor.run_pending().await.unwrap().total(), 0);
}

#[tokio::test]
async fn failure_is_recorded_and_attempts_stay_monotonic() {
    let f = fixture(false).await;
    let d = f.coordinator.register_download(&dune("h2")).await.unwrap();
    let src = book_dir(&f.downloads);
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), None)
        .await
        .unwrap();

    let summary = f.supervisor.run_pending().await.unwrap();
    assert_eq!(summary.failed, 1);
    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Failed);
    assert_eq!(job.attempt_count, 1);
    assert!(job.last_error.as_deref().unwrap().contains("output_path"));
    assert!(src.join("01.mp3").exists(), "source must stay intact");

    assert_eq!(
        f.coordinator.retry_failed_job(&job_id).await.unwrap(),
        RequeueOutcome::Requeued
    );
    f.supervisor.run_pending().await.unwrap();
    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Failed);
    assert_eq!(job.attempt_count, 2);
}

#[tokio::test]
async fn missing_source_fails_the_job() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h3")).await.unwrap();
    let missing = f.downloads.join("nowhere");
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &missing.to_string_lossy(), None)
        .await
        .unwrap();

    f.supervisor.run_pending().await.unwrap();
    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Failed);
    assert!(job.last_error.as_deref().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn rerun_after_finalization_is_a_no_op_success() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h4")).await.unwrap();
    let src = book_dir(&f.downloads);
    let src_str = src.to_string_lossy().to_string();
    let first = f
        .coordinator
        .queue_download_processing(&d.id, &src_str, None)
        .await
        .unwrap();
    f.supervisor.run_pending().await.unwrap();

    // Expire the cooldown so a second job is created for the same source.
    f.coordinator
        .db()
        .set_processing_job_completed_at(&first, unix_timestamp() - 3_600)
        .await
        .unwrap();
    let second = f
        .coordinator
        .queue_download_processing(&d.id, &src_str, None)
        .await
        .unwrap();
    assert_ne!(first, second);

    let summary = f.supervisor.run_pending().await.unwrap();
    assert_eq!(summary.completed, 1);
    let job = f.coordinator.get_job(&second).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Completed);
}

#[tokio::test]
async fn move_jobs_relocate_directories() {
    let f = fixture(true).await;
    let src = book_dir(&f.downloads);
    let dst = f.library.join("Herbert").join("Dune");
    let enq = f
        .coordinator
        .enqueue_move("item-1", &dst.to_string_lossy(), &src.to_string_lossy())
        .await
        .unwrap();

    let summary = f.supervisor.run_pending().await.unwrap();
    assert_eq!(summary.completed, 1);
    let job = f.coordinator.db().get_move_job(&enq.job.id).await.unwrap().unwrap();
    assert_eq!(job.status, MoveJobStatus::Completed);
    assert!(!src.exists());
    assert!(dst.join("01.mp3").exists());
    assert!(dst.join("02.mp3").exists());
}

#[tokio::test]
async fn run_until_shutdown_drains_and_stops() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h5")).await.unwrap();
    let src = book_dir(&f.downloads);

    let (tx, rx) = tokio::sync::watch::channel(false);
    let supervisor = f.supervisor.clone();
    let handle = tokio::spawn(async move { supervisor.run_until_shutdown(rx).await });

    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), None)
        .await
        .unwrap();

    let mut done = false;
    for _ in 0..200 {
        let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
        if job.status == ProcessingJobStatus::Completed {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(done, "job was not processed in time");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn copy_job_rerun_after_crash_does_not_duplicate() {
    let f = fixture_with(true, CompletedFileAction::Copy).await;
    let d = f.coordinator.register_download(&dune("h6")).await.unwrap();
    let src = book_dir(&f.downloads);
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), None)
        .await
        .unwrap();
    assert_eq!(f.supervisor.run_pending().await.unwrap().completed, 1);

    strand(&f, &job_id).await;
    assert_eq!(f.coordinator.recover().await.unwrap(), (1, 0));
    assert_eq!(f.supervisor.run_pending().await.unwrap().completed, 1);

    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Completed);
    assert_eq!(job.attempt_count, 2);
    let book = f.library.join("Frank Herbert").join("Dune");
    assert_eq!(library_files(&book), ["Dune - 01.mp3", "Dune - 02.mp3"]);
    assert!(src.join("01.mp3").exists(), "copy keeps sources");
}

#[tokio::test]
async fn move_job_rerun_with_emptied_source_completes() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h7")).await.unwrap();
    let src = book_dir(&f.downloads);
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), None)
        .await
        .unwrap();
    f.supervisor.run_pending().await.unwrap();

    // The crash hit after the files moved but before the folder was removed.
    fs::create_dir_all(src.join("CD1")).unwrap();
    strand(&f, &job_id).await;
    f.coordinator.recover().await.unwrap();
    assert_eq!(f.supervisor.run_pending().await.unwrap().completed, 1);

    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Completed);
    assert!(job.last_error.is_none());
    let book = f.library.join("Frank Herbert").join("Dune");
    assert_eq!(library_files(&book), ["Dune - 01.mp3", "Dune - 02.mp3"]);
}

#[tokio::test]
async fn recently_touched_job_is_not_recovered() {
    let f = fixture(true).await;
    let d = f.coordinator.register_download(&dune("h8")).await.unwrap();
    let job_id = f
        .coordinator
        .queue_download_processing(&d.id, "/tmp/dune", None)
        .await
        .unwrap();
    let db = f.coordinator.db();
    db.claim_next_processing_job().await.unwrap().unwrap();
    db.touch_processing_job(&job_id).await.unwrap();

    let live = DownloadQueueCoordinator::new(db.clone(), &ShelverConfig::default());
    assert_eq!(live.recover().await.unwrap(), (0, 0));
    let job = f.coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Processing);
}

#[tokio::test]
async fn job_for_linked_item_lands_in_item_folder() {
    let f = fixture(true).await;
    let item_dir = f.library.join("Shelf").join("Dune (1965)");
    f.coordinator
        .db()
        .set_library_item_path("item-1", &item_dir.to_string_lossy())
        .await
        .unwrap();
    let d = f.coordinator.register_download(&dune("h9")).await.unwrap();
    let src = book_dir(&f.downloads);
    f.coordinator
        .queue_download_processing(&d.id, &src.to_string_lossy(), Some("item-1"))
        .await
        .unwrap();

    assert_eq!(f.supervisor.run_pending().await.unwrap().completed, 1);
    assert_eq!(library_files(&item_dir), ["Dune - 01.mp3", "Dune - 02.mp3"]);
    assert!(!f.library.join("Frank Herbert").exists());
    let download = f.coordinator.get_download(&d.id).await.unwrap().unwrap();
    assert_eq!(download.final_path, Some(item_dir.to_string_lossy().into_owned()));
}

#[tokio::test]
async fn completed_move_records_item_folder() {
    let f = fixture(true).await;
    let src = book_dir(&f.downloads);
    let dst = f.library.join("Herbert").join("Dune");
    f.coordinator
        .enqueue_move("item-2", &dst.to_string_lossy(), &src.to_string_lossy())
        .await
        .unwrap();
    f.supervisor.run_pending().await.unwrap();

    let bound = f.coordinator.db().get_library_item_path("item-2").await.unwrap();
    assert_eq!(bound, Some(dst.to_string_lossy().into_owned()));
}
