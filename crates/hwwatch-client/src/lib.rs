//! hwwatch HTTP clients
//!
//! Implementations of the core's [`HomeworkSource`] and [`Notifier`] seams
//! over reqwest: the review-status API client and the Telegram Bot API
//! notifier.
//!
//! [`HomeworkSource`]: hwwatch_core::HomeworkSource
//! [`Notifier`]: hwwatch_core::Notifier

pub mod review_api;
pub mod telegram;

use hwwatch_core::{Config, WatchError};
use thiserror::Error;

pub use review_api::ReviewApiClient;
pub use telegram::TelegramNotifier;

/// Errors that can occur while talking to the external services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status code.
    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus {
        /// Endpoint that answered.
        endpoint: String,
        /// Status code received.
        status: u16,
    },

    /// The response body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The Telegram Bot API rejected the request.
    #[error("Telegram API error: {description}")]
    Telegram {
        /// Description returned by the Bot API.
        description: String,
    },
}

impl ClientError {
    /// Maps this error onto the review-API side of the core taxonomy.
    #[must_use]
    pub fn into_source_error(self) -> WatchError {
        match self {
            Self::Http(e) => WatchError::transport(e.to_string()),
            Self::UnexpectedStatus { endpoint, status } => {
                WatchError::endpoint_unavailable(endpoint, status)
            }
            Self::InvalidJson(e) => WatchError::decode(e.to_string()),
            Self::Telegram { description } => WatchError::transport(description),
        }
    }

    /// Maps this error onto a notification failure.
    #[must_use]
    pub fn into_notify_error(self) -> WatchError {
        WatchError::notify(self.to_string())
    }
}

/// Builds the HTTP client shared by both services.
///
/// Every request made through it is bounded by the configured timeout.
///
/// # Errors
///
/// Returns [`ClientError::Http`] if the TLS backend cannot be initialized.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client, ClientError> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!("hwwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
