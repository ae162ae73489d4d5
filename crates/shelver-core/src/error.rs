//! Typed errors for library finalization.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::retry::{classify_io_error, ErrorKind};

#[derive(Debug, Error)]
pub enum FinalizeError {
    /// Busy or interrupted filesystem call; retrying may succeed.
    #[error("transient I/O error on {path}: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Resolved destination would escape the library root.
    #[error("unsafe destination path: {0}")]
    UnsafePath(PathBuf),
    #[error("no output_path configured; refusing to finalize")]
    MissingOutputRoot,
    #[error("source does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("destination already exists: {0}")]
    DestinationConflict(PathBuf),
    #[error("finalization aborted by user")]
    Aborted,
    #[error("copy verification failed for {0}")]
    VerifyMismatch(PathBuf),
}

impl FinalizeError {
    /// Wrap an I/O error, classifying it as transient or not.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match classify_io_error(&source) {
            ErrorKind::Transient | ErrorKind::Busy => Self::TransientIo { path, source },
            ErrorKind::Other => Self::Io { path, source },
        }
    }
}
