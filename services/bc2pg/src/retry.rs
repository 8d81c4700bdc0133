//! Whole-load retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use wfs_common::LoadResult;

/// Retry settings for a load.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of retries.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> LoadResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LoadResult<T>>,
{
    let mut retry_count = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retry_count < policy.max_retries => {
                retry_count += 1;
                warn!(
                    error = %e,
                    retry = retry_count,
                    max_retries = policy.max_retries,
                    delay_secs = delay.as_secs(),
                    "Load failed, retrying"
                );

                tokio::time::sleep(delay).await;

                // Exponential backoff
                delay = std::cmp::min(delay * 2, policy.max_delay);
            }
            Err(e) => return Err(e),
        }
    }
}
