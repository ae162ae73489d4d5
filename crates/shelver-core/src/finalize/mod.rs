//! Finalization: place a completed download's files into the library.
//!
//! Everything here is blocking filesystem work; async callers run it inside
//! `spawn_blocking`.

mod import;
mod mover;
mod paths;
mod verify;

pub use import::{FileFinalizer, ImportResult, ImportSettings};
pub use mover::FileMover;
pub use paths::{ensure_within_root, list_source_files, remove_empty_tree};
pub use verify::{files_match, sha256_path};
