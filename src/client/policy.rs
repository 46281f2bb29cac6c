use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    NextProvider,
    Fatal,
}

/// Per-provider retry budget with capped exponential backoff.
///
/// Delay before retry `k` (0-based failed attempt) is
/// `min(base_delay * 2^k, max_delay)`. There is no delay after the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    const BASE_DELAY: Duration = Duration::from_millis(1_000);
    const MAX_DELAY: Duration = Duration::from_millis(10_000);

    /// `max_retries` is the total number of attempts per provider (at least 1).
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay: Self::BASE_DELAY,
            max_delay: Self::MAX_DELAY,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Decide what to do next after an attempt failed.
    ///
    /// `attempt` is 0-based (first failure => attempt=0).
    pub(crate) fn decide(&self, err: &ProviderError, attempt: u32) -> Decision {
        if err.is_fatal() {
            return Decision::Fatal;
        }
        if err.is_retriable() && attempt + 1 < self.max_retries {
            return Decision::Retry {
                delay: self.backoff_delay(attempt),
            };
        }
        Decision::NextProvider
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES)
    }
}

/// Sleep for `delay` unless the caller cancels first.
pub(crate) async fn backoff_sleep(
    provider: &str,
    delay: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<(), ProviderError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ProviderError::cancelled(provider)),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
