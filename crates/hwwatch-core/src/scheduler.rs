//! Clock and timer seam for the poll loop.
//!
//! The loop never calls `tokio::time` or the system clock directly, so tests
//! can drive it without waiting on wall-clock sleeps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

/// Source of the current time and of the delay between polls.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now(&self) -> i64;

    /// Suspends the loop for `period`.
    async fn sleep(&self, period: Duration);
}

/// Production scheduler backed by the system clock and `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    async fn sleep(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}
