//! Configuration for the analytics-cluster backend.

use anyhow::Result;

/// Connection settings for the analytics cluster management API.
///
/// Injected into the backend at construction; nothing here is a process-wide
/// constant.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Base URL of the cluster management API, without a trailing slash.
    pub api_base_url: String,

    /// Name of the header carrying the credential.
    pub auth_header: String,

    /// Credential sent with every request.
    pub auth_token: String,

    /// Attempts per outbound call before giving up.
    pub max_retries: u32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl AnalyticsConfig {
    /// Create a config with the default header name, retry budget and
    /// timeout.
    pub fn new(api_base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            auth_header: "X-AUTH-TOKEN".to_string(),
            auth_token: auth_token.into(),
            max_retries: 3,
            timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `FLEETLEASE_ANALYTICS_URL` and `FLEETLEASE_ANALYTICS_TOKEN` are
    /// required; the rest have defaults.
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("FLEETLEASE_ANALYTICS_URL")
            .map_err(|_| anyhow::anyhow!("FLEETLEASE_ANALYTICS_URL is not set"))?;

        let auth_token = std::env::var("FLEETLEASE_ANALYTICS_TOKEN")
            .map_err(|_| anyhow::anyhow!("FLEETLEASE_ANALYTICS_TOKEN is not set"))?;

        let auth_header = std::env::var("FLEETLEASE_ANALYTICS_AUTH_HEADER")
            .unwrap_or_else(|_| "X-AUTH-TOKEN".to_string());

        let max_retries = std::env::var("FLEETLEASE_ANALYTICS_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        let timeout_secs = std::env::var("FLEETLEASE_ANALYTICS_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            api_base_url,
            auth_header,
            auth_token,
            max_retries,
            timeout_secs,
        })
    }
}
