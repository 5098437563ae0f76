//! Client configuration
//!
//! Values are layered with the `config` crate: built-in defaults first, then
//! `AEGIS_*` environment variables.

use config::{Config, Environment};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::error::{ConfigError, ConfigResult};

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Flat shape of the configuration sources
#[derive(Debug, Deserialize)]
struct RawConfig {
    api_url: String,
    token_path: Option<String>,
    request_timeout_secs: u64,
    poll_interval_ms: u64,
    poll_max_backoff_ms: u64,
    poll_max_failures: u32,
}

/// Poll loop timing
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    /// Delay between two status requests
    pub interval: Duration,
    /// Upper bound for the backoff delay after failed requests
    pub max_backoff: Duration,
    /// Consecutive failed requests after which polling gives up
    pub max_consecutive_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_backoff: Duration::from_millis(30_000),
            max_consecutive_failures: 5,
        }
    }
}

/// Configuration for the API client and the poll loop
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash
    pub api_url: String,
    /// File holding the persisted session token
    pub token_path: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    pub poll: PollSettings,
}

impl ClientConfig {
    /// Load the configuration from defaults and environment variables
    ///
    /// # Environment Variables
    /// - `AEGIS_API_URL`: Backend base URL (default: "http://localhost:8080")
    /// - `AEGIS_TOKEN_PATH`: Session token file (default: `<config dir>/aegis/session.json`)
    /// - `AEGIS_REQUEST_TIMEOUT_SECS`: HTTP timeout in seconds (default: 60)
    /// - `AEGIS_POLL_INTERVAL_MS`: Poll interval in milliseconds (default: 2000)
    /// - `AEGIS_POLL_MAX_BACKOFF_MS`: Backoff ceiling in milliseconds (default: 30000)
    /// - `AEGIS_POLL_MAX_FAILURES`: Consecutive failures before giving up (default: 5)
    pub fn load() -> ConfigResult<Self> {
        let raw: RawConfig = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("request_timeout_secs", 60_i64)?
            .set_default("poll_interval_ms", 2000_i64)?
            .set_default("poll_max_backoff_ms", 30_000_i64)?
            .set_default("poll_max_failures", 5_i64)?
            .add_source(Environment::with_prefix("AEGIS").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> ConfigResult<Self> {
        let api_url = raw.api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got {:?}",
                raw.api_url
            )));
        }

        if raw.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        let token_path = raw
            .token_path
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_token_path);

        let interval = Duration::from_millis(raw.poll_interval_ms);
        let max_backoff = Duration::from_millis(raw.poll_max_backoff_ms).max(interval);

        Ok(Self {
            api_url,
            token_path,
            request_timeout: Duration::from_secs(raw.request_timeout_secs.max(1)),
            poll: PollSettings {
                interval,
                max_backoff,
                max_consecutive_failures: raw.poll_max_failures.max(1),
            },
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_path: default_token_path(),
            request_timeout: Duration::from_secs(60),
            poll: PollSettings::default(),
        }
    }
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("aegis"))
        .unwrap_or_else(|| PathBuf::from(".aegis"))
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "AEGIS_API_URL",
        "AEGIS_TOKEN_PATH",
        "AEGIS_REQUEST_TIMEOUT_SECS",
        "AEGIS_POLL_INTERVAL_MS",
        "AEGIS_POLL_MAX_BACKOFF_MS",
        "AEGIS_POLL_MAX_FAILURES",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_client_config_defaults() {
        clear_env();

        let config = ClientConfig::load().unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.poll, PollSettings::default());
        assert!(config.token_path.ends_with("session.json"));
    }

    #[test]
    #[serial]
    fn test_client_config_from_env_with_custom_values() {
        clear_env();
        unsafe {
            std::env::set_var("AEGIS_API_URL", "https://api.example.com/");
            std::env::set_var("AEGIS_TOKEN_PATH", "/tmp/aegis-test/session.json");
            std::env::set_var("AEGIS_POLL_INTERVAL_MS", "1500");
            std::env::set_var("AEGIS_POLL_MAX_BACKOFF_MS", "9000");
            std::env::set_var("AEGIS_POLL_MAX_FAILURES", "3");
        }

        let config = ClientConfig::load().unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(
            config.token_path,
            PathBuf::from("/tmp/aegis-test/session.json")
        );
        assert_eq!(config.poll.interval, Duration::from_millis(1500));
        assert_eq!(config.poll.max_backoff, Duration::from_millis(9000));
        assert_eq!(config.poll.max_consecutive_failures, 3);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_client_config_rejects_non_http_url() {
        clear_env();
        unsafe {
            std::env::set_var("AEGIS_API_URL", "ftp://files.example.com");
        }

        let result = ClientConfig::load();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        clear_env();
    }

    #[test]
    fn test_with_api_url_strips_trailing_slash() {
        let config = ClientConfig::with_api_url("http://127.0.0.1:9000/");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
    }
}
