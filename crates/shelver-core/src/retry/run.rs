//! Retry loop: run a closure until success or policy says stop.

use std::io;

use super::classify::classify_io_error;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a blocking filesystem operation until it succeeds or the retry
/// policy says to stop. Sleeps the calling thread between attempts, so call
/// it from blocking contexts only.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, what: &str, mut f: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify_io_error(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(attempt, delay_ms = d.as_millis() as u64, "{what} failed, retrying: {e}");
                    std::thread::sleep(d);
                    attempt += 1;
                }
            },
        }
    }
}
