//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use ding_adapter::AdapterConfig;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// Path DingTalk posts callbacks to.
    pub callback_path: String,
    /// Prefix the echo handler puts before replies.
    pub echo_prefix: Option<String>,
    /// Adapter credentials and timeouts.
    pub adapter: AdapterConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DING_GATEWAY_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DING_CALLBACK_PATH` | Callback route | `/ding` |
    /// | `DING_ECHO_PREFIX` | Echo reply prefix | none |
    ///
    /// Adapter variables are documented on [`AdapterConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("DING_GATEWAY_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let callback_path = env::var("DING_CALLBACK_PATH").unwrap_or_else(|_| "/ding".to_string());
        if !callback_path.starts_with('/') {
            return Err(ConfigError::InvalidCallbackPath(callback_path));
        }

        let echo_prefix = env::var("DING_ECHO_PREFIX").ok().filter(|p| !p.is_empty());

        Ok(Self {
            addr,
            callback_path,
            echo_prefix,
            adapter: AdapterConfig::from_env()?,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid DING_GATEWAY_ADDR format")]
    InvalidAddr,

    #[error("DING_CALLBACK_PATH must start with '/', got {0:?}")]
    InvalidCallbackPath(String),

    #[error(transparent)]
    Adapter(#[from] ding_adapter::ConfigError),
}
