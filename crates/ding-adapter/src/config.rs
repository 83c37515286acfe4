//! Configuration for the DingTalk adapter.

use std::env;
use std::time::Duration;

/// Default timeout for outbound webhook calls.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Callbacks whose `timestamp` header is further than this from now are rejected.
pub const DEFAULT_TIMESTAMP_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Adapter configuration shared by every bot of a process.
#[derive(Clone)]
pub struct AdapterConfig {
    /// Robot `appSecret`, used to verify inbound signatures.
    pub secret: String,
    /// Token appended as `access_token` to outbound webhook calls.
    pub access_token: Option<String>,
    /// Timeout for a single outbound call.
    pub api_timeout: Duration,
    /// Optional token inbound callbacks must present in `Authorization`.
    pub callback_token: Option<String>,
    /// Freshness window for the `timestamp` header. `None` disables the check.
    pub timestamp_window: Option<Duration>,
}

impl AdapterConfig {
    /// Create a configuration with the given shared secret and defaults elsewhere.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token: None,
            api_timeout: DEFAULT_API_TIMEOUT,
            callback_token: None,
            timestamp_window: Some(DEFAULT_TIMESTAMP_WINDOW),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    pub fn with_callback_token(mut self, token: impl Into<String>) -> Self {
        self.callback_token = Some(token.into());
        self
    }

    pub fn with_timestamp_window(mut self, window: Option<Duration>) -> Self {
        self.timestamp_window = window;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DING_SECRET` | Robot app secret | (required) |
    /// | `DING_ACCESS_TOKEN` | Outbound access token | none |
    /// | `DING_API_TIMEOUT_SECS` | Outbound call timeout | `30` |
    /// | `DING_CALLBACK_TOKEN` | Inbound `Authorization` token | none |
    /// | `DING_TIMESTAMP_WINDOW_SECS` | Timestamp freshness window, `0` disables | `3600` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("DING_SECRET").map_err(|_| ConfigError::MissingSecret)?;

        let api_timeout = match env::var("DING_API_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidNumber("DING_API_TIMEOUT_SECS"))?,
            ),
            Err(_) => DEFAULT_API_TIMEOUT,
        };

        let timestamp_window = match env::var("DING_TIMESTAMP_WINDOW_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber("DING_TIMESTAMP_WINDOW_SECS"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => Some(DEFAULT_TIMESTAMP_WINDOW),
        };

        Ok(Self {
            secret,
            access_token: non_empty_var("DING_ACCESS_TOKEN"),
            api_timeout,
            callback_token: non_empty_var("DING_CALLBACK_TOKEN"),
            timestamp_window,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("secret", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_timeout", &self.api_timeout)
            .field("callback_token", &self.callback_token.as_ref().map(|_| "<redacted>"))
            .field("timestamp_window", &self.timestamp_window)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DING_SECRET environment variable is required")]
    MissingSecret,

    #[error("{0} must be a whole number of seconds")]
    InvalidNumber(&'static str),
}
