//! Retry and backoff policy.
//!
//! Classifies filesystem errors (busy, interrupted, timed out) and makes
//! exponential backoff decisions so the finalizer and the job runners share
//! one consistent policy.

mod classify;
mod policy;
mod run;

pub use classify::classify_io_error;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
