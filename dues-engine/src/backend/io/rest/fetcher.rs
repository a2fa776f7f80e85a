//! Resilient fetcher.
//!
//! Every backend request goes through [`ResilientFetcher`], which retries any
//! failed attempt (network error, timeout, non-2xx status) with a growing
//! delay. A delay multiplies by [`BACKOFF_FACTOR`] after each failure, so the
//! default policy waits 1000ms, 1500ms and 2250ms between its four attempts.
//! Only the last error is kept once attempts run out.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::config::ConfigError;

pub const BACKOFF_FACTOR: f64 = 1.5;

/// Upper bound for a single wait, however many attempts are configured
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(300);

/// Longest error body kept in a [`TransportError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Failure of a single attempt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Failure of a whole request, after retries
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("{label} failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        label: String,
        attempts: u32,
        #[source]
        last_error: TransportError,
    },
    #[error("cannot build a request URL for {label}: {detail}")]
    InvalidUrl { label: String, detail: String },
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } => *attempts,
            FetchError::InvalidUrl { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }
        if initial_delay.is_zero() {
            return Err(ConfigError::InvalidInitialDelay);
        }
        Ok(Self {
            max_attempts,
            initial_delay,
        })
    }

    /// Wait before the attempt after failure number `failure_index` (0-based)
    pub fn delay_for(&self, failure_index: u32) -> Duration {
        let exponent = i32::try_from(failure_index).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * BACKOFF_FACTOR.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF_DELAY)
            .min(MAX_BACKOFF_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` attempts failed.
///
/// The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {}/{}", label, attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(error) if attempt >= max_attempts => {
                warn!("{} failed after {} attempt(s): {}", label, attempt, error);
                return Err(FetchError::Exhausted {
                    label: label.to_string(),
                    attempts: attempt,
                    last_error: error,
                });
            }
            Err(error) => {
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    "{} attempt {}/{} failed: {}; retrying in {:?}",
                    label, attempt, max_attempts, error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// HTTP client that applies a [`RetryPolicy`] to every request
#[derive(Clone)]
pub struct ResilientFetcher {
    http: Client,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(policy: RetryPolicy, request_timeout: Duration) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(http, policy))
    }

    pub fn with_client(http: Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// A successful response whose body is empty or not JSON yields
    /// `Value::Null`; mappers decide what that means.
    pub async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let label = format!("GET {}", url.path());
        let body = self.send(&label, || self.http.get(url.clone())).await?;
        Ok(parse_body(&label, &body))
    }

    /// POST `form` url-encoded to `url` and parse the response like [`Self::get_json`]
    pub async fn post_form<T>(&self, url: Url, form: &T) -> Result<Value, FetchError>
    where
        T: Serialize + ?Sized,
    {
        let label = format!("POST {}", url.path());
        let body = self
            .send(&label, || self.http.post(url.clone()).form(form))
            .await?;
        Ok(parse_body(&label, &body))
    }

    async fn send<B>(&self, label: &str, build: B) -> Result<String, FetchError>
    where
        B: Fn() -> RequestBuilder,
    {
        retry_with_backoff(&self.policy, label, |attempt| {
            debug!("{} attempt {}", label, attempt);
            let request = build();
            async move {
                let response = request.send().await.map_err(classify)?;
                let status = response.status();
                let body = response.text().await.map_err(classify)?;
                if !status.is_success() {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                    });
                }
                Ok(body)
            }
        })
        .await
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

fn parse_body(label: &str, body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("{} returned a body that is not JSON: {}", label, e);
            Value::Null
        }
    }
}
