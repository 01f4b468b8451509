use std::future::Future;

use crate::domain::logger::Logger;
use crate::domain::retry::{RetryPolicy, Retryable};

/// Runs `f` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    logger: &dyn Logger,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                logger.warn(&format!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation, attempt, max_attempts, e, delay
                ));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                logger.error(&format!(
                    "{} failed after {} attempt(s): {}",
                    operation, attempt, e
                ));
                return Err(e);
            }
        }
    }
}
