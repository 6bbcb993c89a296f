//! Shared HTTP retry wrapper with 429/5xx handling and Retry-After support.
//!
//! `send_with_retry()` replaces `builder.send()` for idempotent Drive calls:
//! - Exponential backoff with jitter on 429 (Too Many Requests) and 5xx errors
//! - Retry-After header parsing (seconds form)
//! - Transparent passthrough for non-retryable status codes (4xx except 429)
//! - Requests whose body cannot be cloned (streams) are sent once

use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ProviderError;

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpRetryConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff (default: 1000)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 30000)
    pub max_delay_ms: u64,
    /// Backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get("retry-after")?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(|secs| Duration::from_secs(secs.min(300)))
}

/// Delay for a given retry attempt, with 10-30% jitter
fn calculate_delay(attempt: u32, config: &HttpRetryConfig) -> Duration {
    let base = config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay_ms as f64);
    let jitter = capped * (0.1 + rand::random::<f64>() * 0.2);
    Duration::from_millis((capped + jitter) as u64)
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::ConnectionFailed(err.to_string())
    }
}

/// Send a request, retrying on 429/5xx.
///
/// The final response is returned as-is (including non-success statuses) so
/// callers can map the status themselves.
pub async fn send_with_retry(
    builder: RequestBuilder,
    config: &HttpRetryConfig,
) -> Result<Response, ProviderError> {
    let mut pending = builder;
    let mut attempt = 0;

    loop {
        let retry = pending.try_clone();
        let response = pending.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();

        let next = match retry {
            Some(next) if is_retryable_status(status) && attempt < config.max_retries => next,
            _ => return Ok(response),
        };

        let delay = parse_retry_after(&response).unwrap_or_else(|| calculate_delay(attempt, config));
        tracing::debug!(
            "HTTP {} returned {}. Retry {}/{} after {:?}",
            response.url(), status, attempt + 1, config.max_retries, delay
        );

        tokio::time::sleep(delay).await;
        pending = next;
        attempt += 1;
    }
}

/// Turn a non-success response into a `ProviderError`, passing successes through
pub async fn check_status(response: Response, context: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    tracing::warn!("Drive API error ({}): {} {}", context, status, text);
    let reason = status.canonical_reason().unwrap_or("request failed");
    Err(ProviderError::from_status(status.as_u16(), format!("{}: {}", context, reason)))
}
