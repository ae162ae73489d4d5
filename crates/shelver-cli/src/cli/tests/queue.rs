//! Tests for add, sync, enqueue, job, jobs, retry, move.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_add_with_metadata() {
    match parse(&[
        "shelver", "add", "Frank Herbert - Dune", "--client", "qbit", "--hash", "ABC",
        "--author", "Frank Herbert", "--book", "Dune",
    ]) {
        CliCommand::Add(args) => {
            assert_eq!(args.title, "Frank Herbert - Dune");
            assert_eq!(args.client.as_deref(), Some("qbit"));
            assert_eq!(args.hash.as_deref(), Some("ABC"));
            assert_eq!(args.author.as_deref(), Some("Frank Herbert"));
            assert_eq!(args.book.as_deref(), Some("Dune"));
            assert!(args.series.is_none());
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_sync() {
    match parse(&["shelver", "sync", "qbit", "/tmp/queue.json"]) {
        CliCommand::Sync { client, path } => {
            assert_eq!(client, "qbit");
            assert_eq!(path, PathBuf::from("/tmp/queue.json"));
        }
        _ => panic!("expected Sync"),
    }
}

#[test]
fn cli_parse_enqueue() {
    match parse(&["shelver", "enqueue", "dl-1", "/downloads/Dune"]) {
        CliCommand::Enqueue {
            download,
            source,
            item,
        } => {
            assert_eq!(download, "dl-1");
            assert_eq!(source, PathBuf::from("/downloads/Dune"));
            assert!(item.is_none());
        }
        _ => panic!("expected Enqueue"),
    }
}

#[test]
fn cli_parse_enqueue_with_item() {
    match parse(&["shelver", "enqueue", "dl-1", "/downloads/Dune", "--item", "book-7"]) {
        CliCommand::Enqueue { item, .. } => assert_eq!(item.as_deref(), Some("book-7")),
        _ => panic!("expected Enqueue"),
    }
}

#[test]
fn cli_parse_job() {
    match parse(&["shelver", "job", "abc"]) {
        CliCommand::Job { id } => assert_eq!(id, "abc"),
        _ => panic!("expected Job"),
    }
}

#[test]
fn cli_parse_jobs_filters() {
    match parse(&["shelver", "jobs"]) {
        CliCommand::Jobs { download, status } => {
            assert!(download.is_none());
            assert!(status.is_none());
        }
        _ => panic!("expected Jobs"),
    }
    match parse(&["shelver", "jobs", "--download", "dl-1", "--status", "failed"]) {
        CliCommand::Jobs { download, status } => {
            assert_eq!(download.as_deref(), Some("dl-1"));
            assert_eq!(status.as_deref(), Some("failed"));
        }
        _ => panic!("expected Jobs"),
    }
}

#[test]
fn cli_parse_retry() {
    match parse(&["shelver", "retry", "job-9"]) {
        CliCommand::Retry { id } => assert_eq!(id, "job-9"),
        _ => panic!("expected Retry"),
    }
}

#[test]
fn cli_parse_move() {
    match parse(&["shelver", "move", "item-1", "/library/new", "/library/old"]) {
        CliCommand::Move {
            item,
            destination,
            source,
        } => {
            assert_eq!(item, "item-1");
            assert_eq!(destination, PathBuf::from("/library/new"));
            assert_eq!(source, PathBuf::from("/library/old"));
        }
        _ => panic!("expected Move"),
    }
}

#[test]
fn cli_parse_item_path_is_optional() {
    match parse(&["shelver", "item", "item-1", "/library/Dune"]) {
        CliCommand::Item { id, path } => {
            assert_eq!(id, "item-1");
            assert_eq!(path, Some(PathBuf::from("/library/Dune")));
        }
        _ => panic!("expected Item"),
    }
    match parse(&["shelver", "item", "item-1"]) {
        CliCommand::Item { path, .. } => assert!(path.is_none()),
        _ => panic!("expected Item"),
    }
}

#[test]
fn cli_parse_move_requires_source() {
    assert!(Cli::try_parse_from(["shelver", "move", "item-1", "/library/new"]).is_err());
}
