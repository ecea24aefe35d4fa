//! Retry with exponential backoff for API requests.

use parley_types::ApiError;
use rand::Rng;

/// Configuration for retry behavior on transient API errors.
///
/// Retries are opt-in: the default sends each request exactly once, so a
/// failed status reaches the caller unchanged.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial delay in milliseconds before the first retry.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
        }
    }
}

/// Returns `true` if the error is transient and the request should be retried.
///
/// Rate limits (429), overload (529) and other 5xx statuses are transient, as
/// is any failure to get a response at all. Decode and empty-response errors
/// come from a response that was delivered, so repeating it won't help.
pub fn is_retryable(error: &ApiError) -> bool {
    match error {
        ApiError::Transport(_) => true,
        ApiError::Remote { status, .. } => matches!(status, 429 | 500..=599),
        ApiError::Decode(_) | ApiError::EmptyResponse => false,
    }
}

/// Calculate the delay in milliseconds before the next retry attempt.
///
/// If `retry_after_ms` is provided (from the server's `Retry-After` header),
/// it is used directly (clamped to `max_delay_ms`). Otherwise, exponential
/// backoff is applied: `initial_delay_ms * backoff_factor^attempt` with
/// ±25% jitter, clamped to `max_delay_ms`.
pub fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> u64 {
    if let Some(server_delay) = retry_after_ms {
        return server_delay.min(config.max_delay_ms);
    }

    let base = config.initial_delay_ms as f64 * config.backoff_factor.powi(attempt as i32);
    let clamped = base.min(config.max_delay_ms as f64);

    let jitter_factor = rand::rng().random_range(0.75..=1.25);
    let jittered = clamped * jitter_factor;

    (jittered as u64).min(config.max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(status: u16) -> ApiError {
        ApiError::Remote {
            status,
            message: "x".into(),
            body: String::new(),
            retry_after_ms: None,
        }
    }

    #[test]
    fn default_sends_once() {
        assert_eq!(RetryConfig::default().max_retries, 0);
    }

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(is_retryable(&remote(429)));
        assert!(is_retryable(&remote(500)));
        assert!(is_retryable(&remote(529)));
        assert!(is_retryable(&ApiError::Transport("connection refused".into())));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!is_retryable(&remote(400)));
        assert!(!is_retryable(&remote(401)));
        assert!(!is_retryable(&ApiError::Decode("bad json".into())));
        assert!(!is_retryable(&ApiError::EmptyResponse));
    }

    #[test]
    fn calculate_delay_exponential() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
        };

        let delay0 = calculate_delay(&config, 0, None);
        assert!((750..=1250).contains(&delay0), "delay0={delay0}");

        let delay2 = calculate_delay(&config, 2, None);
        assert!((3000..=5000).contains(&delay2), "delay2={delay2}");
    }

    #[test]
    fn calculate_delay_retry_after_capped() {
        let config = RetryConfig {
            max_delay_ms: 10_000,
            ..RetryConfig::default()
        };
        assert_eq!(calculate_delay(&config, 0, Some(5000)), 5000);
        assert_eq!(calculate_delay(&config, 0, Some(30_000)), 10_000);
    }
}
