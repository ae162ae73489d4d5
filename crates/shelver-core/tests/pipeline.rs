//! End to end: pick a candidate, register it, let the client report it
//! finished, then finalize it into the library.

use std::fs;
use std::path::PathBuf;

use shelver_core::config::{CompletedFileAction, ShelverConfig};
use shelver_core::coordinator::{ClientItemStatus, DownloadQueueCoordinator, QueueItem};
use shelver_core::library_db::{
    DownloadMetadata, DownloadStatus, LibraryDb, MetaKey, NewDownload, ProcessingJobStatus,
};
use shelver_core::scoring::{CandidateResult, ScoringEngine, SourceKind};
use shelver_core::supervisor::ProcessingJobSupervisor;

fn candidate(id: &str, title: &str, quality: &str, seeders: u32) -> CandidateResult {
    CandidateResult {
        id: id.to_string(),
        title: title.to_string(),
        size_bytes: Some(300 * 1024 * 1024),
        quality: Some(quality.to_string()),
        seeders: Some(seeders),
        source: SourceKind::Torrent,
        ..Default::default()
    }
}

#[tokio::test]
async fn completed_download_ends_up_in_library_once() {
    let tmp = tempfile::tempdir().unwrap();
    let library = tmp.path().join("library");
    let downloads = tmp.path().join("downloads");

    let mut cfg = ShelverConfig::default();
    cfg.output_path = Some(library.clone());
    cfg.completed_file_action = CompletedFileAction::Move;
    cfg.naming.file_pattern = "{Author}/{Title}/{Title} - {ChapterNumber:00}".to_string();

    let engine = ScoringEngine::new(cfg.scoring.clone());
    let pick = engine
        .best_pick(vec![
            candidate("popular", "Ursula K. Le Guin - A Wizard of Earthsea [MP3 128]", "MP3 128kbps", 900),
            candidate("lossless", "Ursula K. Le Guin - A Wizard of Earthsea [FLAC]", "FLAC", 4),
        ])
        .expect("a candidate is accepted");
    assert_eq!(pick.candidate.id, "lossless");

    let db = LibraryDb::open_at(tmp.path().join("state").join("library.db"))
        .await
        .unwrap();
    let coordinator = DownloadQueueCoordinator::new(db.clone(), &cfg);
    let supervisor = ProcessingJobSupervisor::new(db, &cfg).with_workers(2);

    let download = coordinator
        .register_download(&NewDownload {
            title: pick.candidate.title.clone(),
            client_id: Some("qbit".to_string()),
            metadata: DownloadMetadata::default()
                .with(MetaKey::TorrentHash, "0123ABCD")
                .with(MetaKey::Author, "Ursula K. Le Guin")
                .with(MetaKey::BookTitle, "A Wizard of Earthsea"),
            ..Default::default()
        })
        .await
        .unwrap();

    let content = downloads.join("Earthsea");
    fs::create_dir_all(&content).unwrap();
    fs::write(content.join("part1.flac"), b"not really flac 1").unwrap();
    fs::write(content.join("part2.flac"), b"not really flac 2").unwrap();

    let finished = QueueItem {
        id: "0123abcd".to_string(),
        title: pick.candidate.title.clone(),
        status: ClientItemStatus::Completed,
        progress: Some(100),
        content_path: Some(content.clone()),
    };
    // The client keeps reporting the item; only the first report queues work.
    for _ in 0..3 {
        coordinator.apply_client_queue("qbit", &[finished.clone()]).await.unwrap();
    }
    let jobs = coordinator.get_jobs_for_download(&download.id).await.unwrap();
    assert_eq!(jobs.len(), 1);

    let summary = supervisor.run_pending().await.unwrap();
    assert_eq!(summary.completed, 1);

    let job = coordinator.get_job(&jobs[0].id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Completed);
    assert_eq!(job.attempt_count, 1);

    let book: PathBuf = library.join("Ursula K. Le Guin").join("A Wizard of Earthsea");
    assert_eq!(
        fs::read(book.join("A Wizard of Earthsea - 01.flac")).unwrap(),
        b"not really flac 1"
    );
    assert_eq!(
        fs::read(book.join("A Wizard of Earthsea - 02.flac")).unwrap(),
        b"not really flac 2"
    );

    let stored = coordinator.get_download(&download.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DownloadStatus::Completed);
    assert_eq!(stored.progress, 100);
    assert_eq!(stored.final_path, Some(book.to_string_lossy().into_owned()));

    // Within the cooldown window asking again hands back the finished job.
    let again = coordinator
        .queue_download_processing(&download.id, &content.to_string_lossy(), None)
        .await
        .unwrap();
    assert_eq!(again, job.id);
}

#[tokio::test]
async fn reopened_database_recovers_stranded_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("library.db");
    let mut cfg = ShelverConfig::default();
    // The claiming process is gone; its heartbeat counts as stale right away.
    cfg.workers.stale_after_secs = 0;

    let job_id = {
        let db = LibraryDb::open_at(&path).await.unwrap();
        let coordinator = DownloadQueueCoordinator::new(db.clone(), &cfg);
        let d = coordinator
            .register_download(&NewDownload {
                title: "Book".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let id = coordinator
            .queue_download_processing(&d.id, "/tmp/book", None)
            .await
            .unwrap();
        let claimed = db.claim_next_processing_job().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        id
    };

    let db = LibraryDb::open_at(&path).await.unwrap();
    let coordinator = DownloadQueueCoordinator::new(db, &cfg);
    assert_eq!(coordinator.recover().await.unwrap(), (1, 0));
    let job = coordinator.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ProcessingJobStatus::Pending);
    assert_eq!(job.attempt_count, 1);
}
