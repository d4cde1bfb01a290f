//! OpenAI client configuration with sensible defaults.

use crate::error::{PensumError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Delay before the first retry; each later retry waits twice as long.
const RETRY_INITIAL_INTERVAL: Duration = Duration::from_secs(1);

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
///
/// The timeout applies per HTTP request, so an exceeded deadline surfaces as a
/// reqwest timeout error that callers can tell apart from other API failures.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PensumError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Backoff allowing roughly `max_retries` retries of a rate-limited request.
///
/// The backoff is bounded by elapsed time, so the budget is the sum of the
/// first `max_retries` intervals without jitter. Zero disables retries.
pub fn retry_backoff(max_retries: u32) -> ExponentialBackoff {
    let budget: Duration = (0..max_retries)
        .map(|i| RETRY_INITIAL_INTERVAL * 2u32.saturating_pow(i))
        .sum();

    ExponentialBackoffBuilder::new()
        .with_initial_interval(RETRY_INITIAL_INTERVAL)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(Some(budget))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_budget_follows_max_retries() {
        assert_eq!(retry_backoff(0).max_elapsed_time, Some(Duration::ZERO));
        assert_eq!(retry_backoff(1).max_elapsed_time, Some(Duration::from_secs(1)));
        assert_eq!(retry_backoff(3).max_elapsed_time, Some(Duration::from_secs(7)));
        assert_eq!(retry_backoff(3).initial_interval, RETRY_INITIAL_INTERVAL);
    }
}
