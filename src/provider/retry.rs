//! Retry policy around a single provider call.
//!
//! Each attempt runs under its own timeout; retryable failures wait a fixed
//! delay before the next attempt. Cancellation is observed both while a call
//! is in flight and while waiting between attempts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::ProviderError;
use super::TopicProvider;
use crate::constants::{
    FIRST_ATTEMPT_TIMEOUT_SECS_DEFAULT, RETRY_ATTEMPT_TIMEOUT_SECS_DEFAULT,
    RETRY_DELAY_MS_DEFAULT, RETRY_MAX_ATTEMPTS_DEFAULT,
};
use crate::pipeline::PromptPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub first_timeout: Duration,
    pub retry_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS_DEFAULT,
            delay: Duration::from_millis(RETRY_DELAY_MS_DEFAULT),
            first_timeout: Duration::from_secs(FIRST_ATTEMPT_TIMEOUT_SECS_DEFAULT),
            retry_timeout: Duration::from_secs(RETRY_ATTEMPT_TIMEOUT_SECS_DEFAULT),
        }
    }
}

impl RetryPolicy {
    /// Timeout for the given 1-based attempt.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.first_timeout
        } else {
            self.retry_timeout
        }
    }
}

/// Result of [`invoke_with_retry`] with the number of attempts actually made.
#[derive(Debug)]
pub struct CallOutcome {
    pub result: Result<String, ProviderError>,
    pub attempts: u32,
}

pub async fn invoke_with_retry<P>(
    provider: &P,
    prompt: &PromptPair,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> CallOutcome
where
    P: TopicProvider + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return CallOutcome {
                result: Err(ProviderError::Cancelled),
                attempts: attempt,
            };
        }
        attempt += 1;

        let timeout = policy.timeout_for(attempt);
        info!(
            attempt,
            max_attempts,
            timeout_secs = timeout.as_secs_f64(),
            "calling provider"
        );

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            outcome = tokio::time::timeout(
                timeout,
                provider.invoke(&prompt.system, &prompt.user),
            ) => outcome.unwrap_or_else(|_| Err(ProviderError::Timeout(timeout))),
        };

        match result {
            Ok(text) => {
                info!(attempt, chars = text.chars().count(), "provider answered");
                return CallOutcome {
                    result: Ok(text),
                    attempts: attempt,
                };
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(attempt, error = %err, "provider call failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return CallOutcome {
                            result: Err(ProviderError::Cancelled),
                            attempts: attempt,
                        };
                    }
                    _ = tokio::time::sleep(policy.delay) => {}
                }
            }
            Err(err) => {
                warn!(attempt, error = %err, "provider call failed");
                return CallOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}
