use crate::policy::RetryPolicy;
use directory::DirectoryError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Backoff with up to 25% random jitter added, still capped
    pub fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let spread = (base.as_millis() as u64 / 4).max(1);
        let extra = rand::thread_rng().gen_range(0..=spread);
        Duration::from_millis((base.as_millis() as u64 + extra).min(self.max_delay_ms))
    }
}

/// Outcome of a retried call and how many attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, DirectoryError>,
    pub attempts: u32,
}

/// Run `call` until it succeeds, fails permanently, or the retry budget is spent.
///
/// Each attempt is bounded by `timeout`; a timed-out attempt counts as transient.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    label: &str,
    mut call: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DirectoryError>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let result = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Unavailable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        };

        match result {
            Err(err) if err.is_transient() => {
                let retries = attempts - 1;
                if retries >= policy.max_retries {
                    warn!("Max retries ({}) exceeded for {}: {}", policy.max_retries, label, err);
                    return Attempted {
                        result: Err(err),
                        attempts,
                    };
                }
                let wait = policy.backoff_with_jitter(attempts);
                warn!(
                    "Retryable error for {}: {}. Attempt {}/{}. Retrying in {:?}",
                    label,
                    err,
                    attempts,
                    policy.max_retries,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            other => {
                debug!("{} finished after {} attempt(s)", label, attempts);
                return Attempted {
                    result: other,
                    attempts,
                };
            }
        }
    }
}
