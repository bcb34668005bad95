//! Retrying JSON client for the analytics cluster management API.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AnalyticsConfig;

/// Transport failures after the local retry budget is spent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-retryable client error.
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// All attempts failed with connection errors or server errors.
    #[error("request to {url} failed after {attempts} attempts: {reason}")]
    Exhausted {
        url: String,
        attempts: u32,
        reason: String,
    },
}

/// HTTP client carrying the credential header and a finite retry budget.
///
/// Every request sends `Content-type: application/json` and
/// `Accept: application/json` plus the configured auth header. Connection
/// errors and 5xx responses are retried up to the budget with a short
/// backoff; 4xx responses fail immediately.
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: String,
    auth_token: String,
    max_retries: u32,
}

impl RestClient {
    /// Build a client from the backend config.
    pub fn new(config: &AnalyticsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header: config.auth_header.clone(),
            auth_token: config.auth_token.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    /// GET a path relative to the base URL and return the raw body.
    pub async fn get_text(&self, path: &str) -> Result<String, TransportError> {
        self.send(Method::GET, path, None).await
    }

    /// PUT a JSON body to a path relative to the base URL.
    pub async fn put_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), TransportError> {
        let payload =
            serde_json::to_value(body).expect("update payload serializes to JSON");
        self.send(Method::PUT, path, Some(payload)).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, TransportError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut last_failure = String::new();

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }

            let mut request = self
                .client
                .request(method.clone(), url.as_str())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .header(self.auth_header.as_str(), self.auth_token.as_str());
            if let Some(ref payload) = body {
                request = request.json(payload);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %url, attempt, "request succeeded");
                    match response.text().await {
                        Ok(text) => return Ok(text),
                        Err(err) => last_failure = format!("reading body: {err}"),
                    }
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!(url = %url, status = %status, "request refused");
                    return Err(TransportError::Status { url, status, body });
                }
                Ok(response) => {
                    last_failure = format!("status {}", response.status());
                    warn!(url = %url, attempt, failure = %last_failure, "request failed, will retry");
                }
                Err(err) => {
                    last_failure = err.to_string();
                    warn!(url = %url, attempt, failure = %last_failure, "request failed, will retry");
                }
            }
        }

        Err(TransportError::Exhausted {
            url,
            attempts: self.max_retries,
            reason: last_failure,
        })
    }
}
