pub mod config;
pub mod logging;

pub mod clock;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod finalize;
pub mod library_db;
pub mod metadata;
pub mod naming;
pub mod retry;
pub mod scoring;
pub mod supervisor;
