//! Tests for run, stats, cleanup, rank, name.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_run_defaults() {
    match parse(&["shelver", "run"]) {
        CliCommand::Run { jobs, watch } => {
            assert!(jobs.is_none());
            assert!(!watch);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_jobs_watch() {
    match parse(&["shelver", "run", "--jobs", "4", "--watch"]) {
        CliCommand::Run { jobs, watch } => {
            assert_eq!(jobs, Some(4));
            assert!(watch);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_stats() {
    assert!(matches!(parse(&["shelver", "stats"]), CliCommand::Stats));
}

#[test]
fn cli_parse_cleanup_default_days() {
    match parse(&["shelver", "cleanup"]) {
        CliCommand::Cleanup { days } => assert_eq!(days, 30),
        _ => panic!("expected Cleanup"),
    }
    match parse(&["shelver", "cleanup", "--days", "7"]) {
        CliCommand::Cleanup { days } => assert_eq!(days, 7),
        _ => panic!("expected Cleanup"),
    }
}

#[test]
fn cli_parse_rank() {
    match parse(&["shelver", "rank", "results.json", "--json"]) {
        CliCommand::Rank { path, json } => {
            assert_eq!(path, PathBuf::from("results.json"));
            assert!(json);
        }
        _ => panic!("expected Rank"),
    }
}

#[test]
fn cli_parse_name_repeated_vars() {
    match parse(&[
        "shelver", "name", "--pattern", "{Author}/{Title}", "--var", "Author=Frank Herbert",
        "--var", "Title=Dune", "--ext", "m4b",
    ]) {
        CliCommand::Name { pattern, vars, ext } => {
            assert_eq!(pattern.as_deref(), Some("{Author}/{Title}"));
            assert_eq!(vars, vec!["Author=Frank Herbert", "Title=Dune"]);
            assert_eq!(ext.as_deref(), Some("m4b"));
        }
        _ => panic!("expected Name"),
    }
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["shelver", "frobnicate"]).is_err());
}
