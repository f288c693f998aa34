use crate::core::config::MarketConfig;
use anyhow::{Context, Result, bail};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("finadvisor/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for the upstream providers. `timeout` bounds each
/// request from connect to the end of the body.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Attempts made for every upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub delay_ms: u64,
    /// Upper bound of a single attempt.
    pub attempt_timeout_ms: u64,
}

impl RetryPolicy {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl From<&MarketConfig> for RetryPolicy {
    fn from(config: &MarketConfig) -> Self {
        let timeouts = &config.timeouts_ms;
        RetryPolicy {
            retries: config.retries,
            delay_ms: config.retry_delay_ms,
            attempt_timeout_ms: timeouts.crypto.max(timeouts.stocks).max(timeouts.forex),
        }
    }
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay_ms: u64) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {:#}. Retrying...",
                    attempt,
                    retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Parses an upstream number that may arrive as a string, e.g. `"-0.6%"`.
pub fn parse_number(raw: &str, field: &str) -> Result<f64> {
    let value = raw
        .trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .with_context(|| format!("Invalid number in field {field}: {raw:?}"))?;
    if !value.is_finite() {
        bail!("Non-finite number in field {field}: {raw:?}");
    }
    Ok(value)
}
