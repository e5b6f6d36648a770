//! Exponential backoff for transient provider failures

use crate::error::AdvisorError;
use crate::Result;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// No waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Map a failed send into the matching advisor error
pub fn classify_send_error(provider: &str, error: reqwest::Error) -> AdvisorError {
    if error.is_timeout() || error.is_connect() {
        AdvisorError::LlmUnavailable(format!("{} request failed: {}", provider, error))
    } else {
        AdvisorError::LlmError(format!("{} request failed: {}", provider, error))
    }
}

/// Map a non-success HTTP status into the matching advisor error
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> AdvisorError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    if is_retryable_status(status) {
        AdvisorError::LlmUnavailable(message)
    } else {
        AdvisorError::LlmError(message)
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out
pub async fn with_retry<T, Op, Fut>(policy: &RetryPolicy, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(AdvisorError::LlmUnavailable(message)) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Transient LLM failure; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = with_retry(&RetryPolicy::immediate(2), || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(AdvisorError::LlmUnavailable("503".into()));
                }
                Ok("answer")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&RetryPolicy::immediate(5), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AdvisorError::LlmError("400 bad request".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(AdvisorError::LlmError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&RetryPolicy::immediate(1), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AdvisorError::LlmUnavailable("429".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(AdvisorError::LlmUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        for _ in 0..10 {
            delay = policy.next_delay(delay);
        }
        assert_eq!(delay, policy.max_delay);
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(matches!(
            classify_status("Gemini", StatusCode::BAD_REQUEST, "bad"),
            AdvisorError::LlmError(_)
        ));
    }
}
