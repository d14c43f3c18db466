//! Notifier over the Telegram Bot API `sendMessage` method.

use async_trait::async_trait;
use hwwatch_core::{Config, Notifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ClientError;

/// Request body of `sendMessage`.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends text messages to one chat through a Telegram bot.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

// The token is part of every request URL; keep it out of logs.
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    /// Creates a notifier for `chat_id` using the bot `token`.
    ///
    /// `api_url` is the Bot API base URL, normally `https://api.telegram.org`.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Creates a notifier from the Telegram settings in `config`.
    #[must_use]
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::new(
            http,
            &config.telegram_api_url,
            &config.telegram_token,
            &config.telegram_chat_id,
        )
    }

    /// The chat messages are delivered to.
    #[must_use]
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token)
    }

    /// Sends `text` to the configured chat.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] if the request fails (the URL is stripped from the error)
    /// - [`ClientError::Telegram`] if the Bot API answers `"ok": false`
    /// - [`ClientError::UnexpectedStatus`] for an error status without a Bot API body
    #[instrument(skip(self, text), fields(chat_id = %self.chat_id, len = text.len()))]
    pub async fn send_message(&self, text: &str) -> Result<(), ClientError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let raw = response.text().await.map_err(reqwest::Error::without_url)?;

        match serde_json::from_str::<ApiResponse>(&raw) {
            Ok(api) if api.ok => {
                debug!("Message sent");
                Ok(())
            }
            Ok(api) => Err(ClientError::Telegram {
                description: api
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            }),
            Err(_) if !status.is_success() => Err(ClientError::UnexpectedStatus {
                endpoint: "sendMessage".to_string(),
                status: status.as_u16(),
            }),
            Err(e) => Err(ClientError::InvalidJson(e)),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> hwwatch_core::Result<()> {
        self.send_message(text)
            .await
            .map_err(ClientError::into_notify_error)
    }
}
