use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response};
use std::cmp::min;
use tokio::time::{sleep, Duration};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// Server errors and transport failures are only retried for requests
    /// that are safe to repeat; throttling is always retried.
    pub idempotent: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            idempotent: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Same policy for a request that must not be repeated after the server
    /// may have acted on it.
    pub fn non_idempotent(&self) -> Self {
        Self {
            idempotent: false,
            ..self.clone()
        }
    }

    pub fn retries_status(&self, status_code: u16) -> bool {
        if self.idempotent {
            should_retry_status(status_code)
        } else {
            status_code == 429
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms =
            self.base_delay.as_millis() as f64 * self.exponential_base.powi(exponent);

        let delay = Duration::from_millis(delay_ms as u64);
        min(delay, self.max_delay)
    }
}

pub fn should_retry_status(status_code: u16) -> bool {
    matches!(status_code, 429 | 500 | 502 | 503 | 504)
}

/// Seconds from a `Retry-After` header, if the server sent one.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Sends `request`, retrying throttled or failed attempts with backoff.
///
/// The final response is returned whatever its status; only transport errors
/// that outlive the retries become `Err`.
pub async fn send_with_retry(request: RequestBuilder, config: &RetryConfig) -> AppResult<Response> {
    let mut attempt = 0;

    loop {
        let current = request
            .try_clone()
            .ok_or_else(|| AppError::Config("Request body cannot be replayed".to_string()))?;

        match current.send().await {
            Ok(response) => {
                let status = response.status();
                attempt += 1;
                if config.retries_status(status.as_u16()) && attempt <= config.max_retries {
                    let delay = retry_after(response.headers())
                        .map(|delay| min(delay, config.max_delay))
                        .unwrap_or_else(|| config.backoff_delay(attempt));
                    log::warn!(
                        "Request to {} answered {}, retrying in {:?} (attempt {}/{})",
                        response.url().path(),
                        status,
                        delay,
                        attempt,
                        config.max_retries
                    );
                    sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(e) => {
                attempt += 1;
                let error = AppError::from(e);
                if config.idempotent && error.is_retryable() && attempt <= config.max_retries {
                    let delay = config.backoff_delay(attempt);
                    log::warn!(
                        "Request attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        error
                    );
                    sleep(delay).await;
                    continue;
                }
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            exponential_base: 2.0,
            idempotent: true,
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(4), Duration::from_millis(500));
    }

    #[test]
    fn test_retryable_statuses() {
        for code in [429, 500, 502, 503, 504] {
            assert!(should_retry_status(code), "{} should be retried", code);
        }
        for code in [200, 201, 400, 401, 404, 409] {
            assert!(!should_retry_status(code), "{} should not be retried", code);
        }
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("-5"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_oversized_retry_after_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("1e300"));
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("99999999999999999999"));
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("inf"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_non_idempotent_only_retries_throttling() {
        let config = RetryConfig::default().non_idempotent();
        assert!(!config.idempotent);
        assert!(config.retries_status(429));
        for code in [500, 502, 503, 504] {
            assert!(!config.retries_status(code), "{} should not be retried", code);
        }
        assert_eq!(config.max_retries, RetryConfig::default().max_retries);
        assert!(RetryConfig::default().retries_status(503));
    }
}
