//! Provider error retriability.

use std::time::Duration;

use tokio_retry::strategy::FixedInterval;

use super::types::ProviderError;
use crate::config::HTTP_STATUS_TOO_MANY_REQUESTS;

impl ProviderError {
    /// Determines if the failure is transient (worth the single retry).
    ///
    /// # Retriable
    ///
    /// - Timeouts
    /// - Connection/request failures
    /// - Rate limiting (429 Too Many Requests)
    /// - Server errors (5xx)
    ///
    /// # Non-Retriable
    ///
    /// - Client errors (4xx except 429)
    /// - Malformed payloads: the provider answered, retrying returns the same body
    /// - Cancellation
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout => true,
            ProviderError::Status(code) => {
                *code == HTTP_STATUS_TOO_MANY_REQUESTS || (500..600).contains(code)
            }
            ProviderError::Transport(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            ProviderError::Malformed(_) | ProviderError::Cancelled => false,
        }
    }
}

/// Retry strategy for provider calls: exactly one retry after `delay`.
pub(crate) fn retry_once(delay: Duration) -> impl Iterator<Item = Duration> {
    FixedInterval::new(delay).take(1)
}
