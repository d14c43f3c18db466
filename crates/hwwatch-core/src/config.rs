//! Configuration for the hwwatch poll loop.
//!
//! All settings come from the process environment (optionally seeded from a
//! `.env` file by the binary). Three credentials are required; everything
//! else has a default.

use std::time::Duration;

use crate::error::{Result, WatchError};

/// Environment variable holding the review API OAuth token.
pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
/// Environment variable holding the destination chat identifier.
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

const ENDPOINT: &str = "HWWATCH_ENDPOINT";
const TELEGRAM_API_URL: &str = "HWWATCH_TELEGRAM_API_URL";
const RETRY_PERIOD: &str = "HWWATCH_RETRY_PERIOD";
const HTTP_TIMEOUT: &str = "HWWATCH_HTTP_TIMEOUT";
const LOG_DIR: &str = "HWWATCH_LOG_DIR";
const LOG_FILE: &str = "HWWATCH_LOG_FILE";
const LOG_BACKUPS: &str = "HWWATCH_LOG_BACKUPS";

/// Required keys, checked in this order.
pub const REQUIRED_KEYS: [&str; 3] = [PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID];

/// Default review-status endpoint.
fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

/// Default Telegram Bot API base URL.
fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Default delay between polls, in seconds.
const fn default_retry_period() -> u64 {
    600
}

/// Default HTTP request timeout, in seconds.
const fn default_http_timeout() -> u64 {
    30
}

fn default_log_dir() -> String {
    ".".to_string()
}

fn default_log_file() -> String {
    "hwwatch.log".to_string()
}

const fn default_log_backups() -> usize {
    5
}

/// Runtime configuration, constructed once at startup and passed down.
#[derive(Clone)]
pub struct Config {
    /// OAuth token for the review API.
    pub practicum_token: String,
    /// Telegram bot token.
    pub telegram_token: String,
    /// Destination chat identifier.
    pub telegram_chat_id: String,
    /// Review-status endpoint URL.
    pub endpoint: String,
    /// Telegram Bot API base URL.
    pub telegram_api_url: String,
    /// Delay between polls in seconds.
    pub retry_period_secs: u64,
    /// Timeout applied to every HTTP request, in seconds.
    pub http_timeout_secs: u64,
    /// Directory holding the rotating log files.
    pub log_dir: String,
    /// File name prefix of the rotating log files.
    pub log_file: String,
    /// Number of rotated log files kept on disk.
    pub log_backups: usize,
}

// Tokens stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("endpoint", &self.endpoint)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("retry_period_secs", &self.retry_period_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("log_dir", &self.log_dir)
            .field("log_file", &self.log_file)
            .field("log_backups", &self.log_backups)
            .finish()
    }
}

impl Config {
    /// Builds a configuration with the given credentials and default settings.
    #[must_use]
    pub fn new(
        practicum_token: impl Into<String>,
        telegram_token: impl Into<String>,
        telegram_chat_id: impl Into<String>,
    ) -> Self {
        Self {
            practicum_token: practicum_token.into(),
            telegram_token: telegram_token.into(),
            telegram_chat_id: telegram_chat_id.into(),
            endpoint: default_endpoint(),
            telegram_api_url: default_telegram_api_url(),
            retry_period_secs: default_retry_period(),
            http_timeout_secs: default_http_timeout(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            log_backups: default_log_backups(),
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::ConfigurationMissing` naming the first required
    /// key that is absent, or `WatchError::ConfigValidationError` if an
    /// optional numeric value cannot be used.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| WatchError::config_missing(key));

        let mut config = Self::new(
            require(PRACTICUM_TOKEN)?,
            require(TELEGRAM_TOKEN)?,
            require(TELEGRAM_CHAT_ID)?,
        );

        if let Some(endpoint) = get(ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(url) = get(TELEGRAM_API_URL) {
            config.telegram_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = get(LOG_DIR) {
            config.log_dir = dir;
        }
        if let Some(file) = get(LOG_FILE) {
            config.log_file = file;
        }
        if let Some(raw) = get(RETRY_PERIOD) {
            config.retry_period_secs = parse_number(RETRY_PERIOD, &raw)?;
        }
        if let Some(raw) = get(HTTP_TIMEOUT) {
            config.http_timeout_secs = parse_number(HTTP_TIMEOUT, &raw)?;
        }
        if let Some(raw) = get(LOG_BACKUPS) {
            config.log_backups = parse_number(LOG_BACKUPS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `retry_period_secs` must be greater than 0
    /// - `http_timeout_secs` must be greater than 0
    /// - `log_backups` must be greater than 0
    /// - `endpoint` and `telegram_api_url` must be http(s) URLs
    pub fn validate(&self) -> Result<()> {
        if self.retry_period_secs == 0 {
            return Err(WatchError::config_validation(
                format!("{RETRY_PERIOD} must be greater than 0"),
                format!("Set {RETRY_PERIOD} to at least 1 second"),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(WatchError::config_validation(
                format!("{HTTP_TIMEOUT} must be greater than 0"),
                format!("Set {HTTP_TIMEOUT} to at least 1 second"),
            ));
        }

        if self.log_backups == 0 {
            return Err(WatchError::config_validation(
                format!("{LOG_BACKUPS} must be greater than 0"),
                format!("Set {LOG_BACKUPS} to at least 1"),
            ));
        }

        for (key, url) in [
            (ENDPOINT, &self.endpoint),
            (TELEGRAM_API_URL, &self.telegram_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(WatchError::config_validation(
                    format!("{key} must be an http(s) URL, got '{url}'"),
                    format!("Provide a full URL in {key}, e.g. https://example.com/"),
                ));
            }
        }

        Ok(())
    }

    /// Delay between two polls.
    #[must_use]
    pub const fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period_secs)
    }

    /// Timeout applied to outbound HTTP requests.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        WatchError::config_validation(
            format!("{key} must be a non-negative integer, got '{raw}'"),
            format!("Fix or remove {key} in your environment"),
        )
    })
}
