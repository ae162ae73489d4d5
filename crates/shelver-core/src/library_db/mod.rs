//! Persistent library database (SQLite via sqlx).
//!
//! Stores downloads with their client correlation keys, processing jobs
//! (finalize a completed download), move jobs (relocate a library item) and
//! the folder each library item lives in.
//! Jobs are kept after they finish; completed rows anchor the cooldown.

pub mod db;
mod downloads;
mod items;
mod move_jobs;
mod processing_jobs;
pub mod types;

pub use db::*;
pub use types::*;
