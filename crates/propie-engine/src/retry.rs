//! Bounded retry with per-attempt timeout for persistence calls.
//!
//! Only transient failures (`StoreError::is_transient`) are retried. Each
//! attempt is wrapped in `tokio::time::timeout`; a timeout counts as
//! transient.

use std::future::Future;
use std::time::Duration;

use propie_config::RetryConfig;

use crate::error::StoreError;

/// Result of a retried call: the final outcome plus how many attempts ran.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, StoreError>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or `retry.max_attempts`
/// is reached.
pub async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    timeout: Duration,
    operation: &str,
    mut op: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(timeout)),
        };
        match result {
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    ?delay,
                    error = %e,
                    "transient persistence failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => {
                return Attempted {
                    result,
                    attempts: attempt,
                };
            }
        }
    }
}
