use crate::backends::{error_status, is_timeout, GenerationBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use syncpro_core::{SyncproError, SyncproResult};
use tracing::{info, warn};

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync,
>;

/// Configures retry behaviour for generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base_ms: 500,
            backoff_max_ms: 5_000,
        }
    }
}

/// Determines whether an error is transient and worth retrying.
///
/// Only the structured markers set by the HTTP backends are consulted:
/// timeouts and statuses 429, 500, 502, 503 and 504 are retried. Anything
/// else, including 4xx client errors and failures without a status, is not.
pub fn is_retryable(err: &SyncproError) -> bool {
    is_timeout(err) || matches!(error_status(err), Some(429 | 500 | 502 | 503 | 504))
}

/// Computes the backoff delay for a given attempt using exponential backoff
/// capped at `backoff_max_ms`.
fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy.backoff_base_ms.saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

/// A `GenerationBackend` that retries transient failures of an inner backend
/// with exponential backoff. Non-retryable errors are returned at once; when
/// retries run out, the last error is returned.
pub struct RetryingBackend {
    inner: Box<dyn GenerationBackend>,
    policy: RetryPolicy,
    /// Injectable sleep function for testing (allows skipping real delays).
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl RetryingBackend {
    pub fn new(inner: Box<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            #[cfg(test)]
            sleep_fn: None,
        }
    }

    async fn do_sleep(&self, ms: u64) {
        #[cfg(test)]
        if let Some(ref f) = self.sleep_fn {
            f(ms).await;
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl GenerationBackend for RetryingBackend {
    async fn generate(&self, model_id: &str, prompt: &str) -> SyncproResult<String> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(model_id, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if !is_retryable(&e) => {
                    warn!(model = model_id, attempt, error = %e, "Non-retryable generation error");
                    return Err(e);
                }
                Err(e) if attempt >= self.policy.max_retries => {
                    warn!(model = model_id, attempt, error = %e, "Generation retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = compute_backoff(&self.policy, attempt);
                    info!(
                        model = model_id,
                        attempt,
                        delay_ms = delay,
                        error = %e,
                        "Retryable generation error, backing off"
                    );
                    self.do_sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
