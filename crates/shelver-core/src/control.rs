//! Job control for cancel: shared abort tokens.
//!
//! When the supervisor runs a job, the job is registered with an abort token.
//! A caller can request abort for a job; the copy fallback checks the token
//! between files and stops before deleting anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Shared registry of job id -> abort token.
#[derive(Debug, Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<String, Arc<AtomicBool>>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job; returns the abort token to pass to the finalizer.
    pub fn register(&self, job_id: &str) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id.to_string(), Arc::clone(&token));
        token
    }

    /// Unregister a job (call when the job finishes, success or failure).
    pub fn unregister(&self, job_id: &str) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_id);
    }

    /// Request abort for a running job. Returns false if the job is not running.
    pub fn request_abort(&self, job_id: &str) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
        {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(job_id)
    }
}

/// True once abort has been requested on the token.
pub fn is_aborted(token: Option<&AtomicBool>) -> bool {
    token.is_some_and(|t| t.load(Ordering::Relaxed))
}
