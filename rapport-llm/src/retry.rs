//! Explicit retry policy for provider calls.
//!
//! The policy is a value handed to [`crate::LlmClient`], not a wrapper applied
//! around arbitrary functions: every retry the client performs is visible in
//! [`RetryPolicy::run`].

use std::future::Future;
use std::time::Duration;

use rapport_core::config::RetryConfig;
use tracing::{debug, warn};

use crate::error::LlmError;

/// Exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_backoff: Duration,
    /// Growth factor per retry (at least 1.0).
    pub multiplier: f64,
    /// Upper bound on any single wait.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
            max_backoff: Duration::ZERO,
        }
    }

    /// Policy from the `[llm.retry]` section.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.backoff_multiplier.max(1.0),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Wait before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_backoff
        }
    }

    /// Total attempts this policy allows.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the policy is spent.
    ///
    /// # Errors
    /// Returns the first non-retryable error unchanged, or
    /// [`LlmError::RetriesExhausted`] after the last transient failure.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut last_error = String::new();
        for n in 0..self.max_attempts() {
            if n > 0 {
                let wait = self.backoff_for(n);
                debug!(
                    call = label,
                    attempt = n + 1,
                    max_attempts = self.max_attempts(),
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Retrying LLM call"
                );
                tokio::time::sleep(wait).await;
            }
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(call = label, attempt = n + 1, error = %e, "LLM call failed");
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(LlmError::RetriesExhausted {
            attempts: self.max_attempts(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(350),
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let p = policy(5);
        assert_eq!(p.backoff_for(0), Duration::ZERO);
        assert_eq!(p.backoff_for(1), Duration::from_millis(100));
        assert_eq!(p.backoff_for(2), Duration::from_millis(200));
        assert_eq!(p.backoff_for(3), Duration::from_millis(350));
        assert_eq!(p.backoff_for(30), Duration::from_millis(350));
    }

    #[test]
    fn from_config_clamps_multiplier() {
        let config = RetryConfig {
            backoff_multiplier: 0.5,
            ..RetryConfig::default()
        };
        assert!((RetryPolicy::from_config(&config).multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let out = policy(3)
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(LlmError::Unavailable("warming up".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .expect("third attempt succeeds");
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts() {
        let calls = AtomicU32::new(0);
        let err = policy(2)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LlmError::Timeout(10)) }
            })
            .await
            .expect_err("never succeeds");
        assert!(matches!(err, LlmError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_stop_immediately() {
        let calls = AtomicU32::new(0);
        let err = policy(5)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LlmError::Http { status: 401, body: "no key".into() }) }
            })
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, LlmError::Http { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
