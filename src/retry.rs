//! Classification-driven retry loop.

use std::error::Error;
use std::future::Future;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::classify::ErrorClassifier;

// == Retry Loop ==
/// Runs `operation` until it succeeds or the classifier says stop.
///
/// Each failure is classified; the attempt is retried only while the
/// classification allows it and the retry count is under both its
/// `max_retries` and `max_retries_cap`. The back-off before retry `n`
/// is `retry_delay * backoff_multiplier^n`, capped at `max_delay`.
/// `operation` receives the 0-based attempt number.
pub async fn retry_classified<F, Fut, T, E>(max_retries_cap: Option<u32>, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let classification = ErrorClassifier::classify(&error);
        let strategy = &classification.retry_strategy;
        let budget = match max_retries_cap {
            Some(cap) => strategy.max_retries.min(cap),
            None => strategy.max_retries,
        };

        if !strategy.should_retry || attempt >= budget {
            debug!(
                attempt,
                kind = %classification.kind,
                error = %error,
                "Giving up after failed attempt"
            );
            return Err(error);
        }

        let delay = strategy.delay_for(attempt);
        warn!(
            attempt = attempt + 1,
            max_retries = budget,
            delay_ms = delay.as_millis() as u64,
            kind = %classification.kind,
            error = %error,
            "Attempt failed, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
