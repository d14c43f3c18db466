//! Seams to the two external services the loop talks to.
//!
//! Implementations live in the `hwwatch-client` crate; the loop only sees
//! these traits.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Fetches review statuses from the upstream API.
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    /// Requests homework statuses changed since `from_date` (Unix seconds).
    ///
    /// Returns the decoded JSON body without checking its shape.
    ///
    /// # Errors
    ///
    /// `EndpointUnavailable` for a non-200 answer, `TransportFailure` for
    /// network errors and `DecodeFailure` for a body that is not JSON.
    async fn fetch(&self, from_date: i64) -> Result<Value>;
}

/// Delivers text messages to the configured chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to the chat.
    ///
    /// # Errors
    ///
    /// `NotifyFailure` if the message could not be delivered.
    async fn send(&self, text: &str) -> Result<()>;
}
