//! Client for the homework review-status API.

use async_trait::async_trait;
use hwwatch_core::{Config, HomeworkSource};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::ClientError;

/// Fetches homework statuses with an OAuth token.
///
/// # Example
///
/// ```no_run
/// use hwwatch_client::{build_http_client, ReviewApiClient};
/// use hwwatch_core::Config;
///
/// # async fn example() -> Result<(), hwwatch_client::ClientError> {
/// let config = Config::from_env().expect("configuration");
/// let client = ReviewApiClient::from_config(build_http_client(&config)?, &config);
/// let body = client.get_statuses(1_700_000_000).await?;
/// println!("{body}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReviewApiClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for ReviewApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewApiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ReviewApiClient {
    /// Creates a client for `endpoint` authenticating with `token`.
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    /// Creates a client from the endpoint and token in `config`.
    #[must_use]
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::new(http, &config.endpoint, &config.practicum_token)
    }

    /// The endpoint this client polls.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Requests statuses changed since `from_date` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] if the request fails or times out
    /// - [`ClientError::UnexpectedStatus`] for anything but `200 OK`
    /// - [`ClientError::InvalidJson`] if the body is not JSON
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_statuses(&self, from_date: i64) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Review API answered");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl HomeworkSource for ReviewApiClient {
    async fn fetch(&self, from_date: i64) -> hwwatch_core::Result<Value> {
        self.get_statuses(from_date)
            .await
            .map_err(ClientError::into_source_error)
    }
}
