//! JSON-over-HTTP plumbing shared by the provider clients.
//!
//! Maps HTTP outcomes onto [`ProviderErrorKind`] and retries with
//! exponential backoff:
//! - HTTP 429 → `RateLimited`, retried
//! - HTTP 5xx, network errors, timeouts → `Unavailable`, retried
//! - other HTTP 4xx → `InvalidInput`, fails immediately
//! - a 2xx body that does not decode → `Unavailable`, not retried
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! With `max_retries = 0` the first failure is returned unchanged.

use std::time::Duration;

use context_qa_core::{ProviderError, ProviderErrorKind};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// How many times a failed request is re-sent, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(5);
        self.base_delay * (1u32 << exp)
    }
}

/// Classify a non-success HTTP status.
pub fn status_error(status: StatusCode, body: &str, service: &str) -> ProviderError {
    let kind = if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderErrorKind::RateLimited
    } else if status.is_client_error() {
        ProviderErrorKind::InvalidInput
    } else {
        ProviderErrorKind::Unavailable
    };
    ProviderError::new(kind, format!("{} API error {}: {}", service, status, body))
}

/// A `reqwest` client bound to one service, with its retry policy.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    bearer: Option<String>,
    retry: RetryPolicy,
    service: &'static str,
}

impl JsonClient {
    pub fn new(
        service: &'static str,
        timeout: Duration,
        bearer: Option<String>,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bearer,
            retry,
            service,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// POST `body` to `url` and decode the JSON response.
    pub async fn post<B, T>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.post_once(url, body).await {
                Ok(value) => return Ok(value),
                Err(SendError::Final(err)) => return Err(err),
                Err(SendError::Retryable(err)) => {
                    if attempt >= self.retry.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        service = self.service,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying provider request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn post_once<B, T>(&self, url: &str, body: &B) -> Result<T, SendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            SendError::Retryable(ProviderError::unavailable(format!(
                "{} connection error ({}): {}",
                self.service, url, e
            )))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let err = status_error(status, &body_text, self.service);
            return Err(if err.is_retryable() {
                SendError::Retryable(err)
            } else {
                SendError::Final(err)
            });
        }

        let text = response.text().await.map_err(|e| {
            SendError::Retryable(ProviderError::unavailable(format!(
                "{} response read failed: {}",
                self.service, e
            )))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SendError::Final(ProviderError::unavailable(format!(
                "Invalid {} response: {}",
                self.service, e
            )))
        })
    }
}

enum SendError {
    Retryable(ProviderError),
    Final(ProviderError),
}

/// Join a base URL and an API path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
