//! The perpetual fetch, validate, notify, sleep cycle.
//!
//! A [`PollLoop`] owns the only mutable state of the program: the cursor
//! passed as `from_date` to the review API and the last error message that
//! was delivered to the chat. Every failure inside an iteration is contained
//! at the iteration boundary; nothing here terminates the process.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Result, WatchError};
use crate::response::validate;
use crate::scheduler::Scheduler;
use crate::service::{HomeworkSource, Notifier};
use crate::verdict::render;

/// Message sent once when the loop starts.
pub const STARTUP_MESSAGE: &str = "Bot is active";

/// Builds the chat message reporting a failed iteration.
#[must_use]
pub fn failure_message(error: &WatchError) -> String {
    format!("Program failure: {error}")
}

// ============================================================================
// IterationOutcome
// ============================================================================

/// Result of a single poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A status change was delivered and the cursor moved to `cursor`.
    Notified {
        /// The new cursor value.
        cursor: i64,
    },
    /// The API reported no homework changes; the cursor did not move.
    NoNewStatus,
    /// The iteration failed; the cursor did not move.
    Failed {
        /// The error that aborted the iteration.
        error: WatchError,
        /// Whether a failure report was delivered to the chat.
        reported: bool,
    },
}

impl IterationOutcome {
    /// Returns `true` unless the iteration failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

// ============================================================================
// PollLoop
// ============================================================================

/// Polls the review API and forwards status changes to the chat.
///
/// Generic over its collaborators so tests can substitute the network and
/// the clock.
#[derive(Debug)]
pub struct PollLoop<S, N, C> {
    source: S,
    notifier: N,
    scheduler: C,
    retry_period: Duration,
    cursor: i64,
    last_error: Option<String>,
    iteration: u64,
}

impl<S, N, C> PollLoop<S, N, C>
where
    S: HomeworkSource,
    N: Notifier,
    C: Scheduler,
{
    /// Creates a loop whose cursor starts at the scheduler's current time.
    pub fn new(source: S, notifier: N, scheduler: C, retry_period: Duration) -> Self {
        let cursor = scheduler.now();
        Self {
            source,
            notifier,
            scheduler,
            retry_period,
            cursor,
            last_error: None,
            iteration: 0,
        }
    }

    /// Overrides the starting cursor.
    #[must_use]
    pub const fn with_cursor(mut self, cursor: i64) -> Self {
        self.cursor = cursor;
        self
    }

    /// Lower bound of the next poll window.
    pub const fn cursor(&self) -> i64 {
        self.cursor
    }

    /// The last failure message delivered to the chat, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of iterations run so far.
    pub const fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Sends [`STARTUP_MESSAGE`]. Returns whether it was delivered.
    pub async fn announce(&self) -> bool {
        match self.notifier.send(STARTUP_MESSAGE).await {
            Ok(()) => {
                debug!("Startup message sent");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to send startup message");
                false
            }
        }
    }

    /// Runs one iteration without sleeping.
    ///
    /// The cursor advances only after the status message was delivered. Any
    /// failure is logged and, unless it repeats the last delivered report,
    /// forwarded to the chat.
    pub async fn tick(&mut self) -> IterationOutcome {
        self.iteration += 1;
        debug!(iteration = self.iteration, cursor = self.cursor, "Polling review API");

        match self.poll_once().await {
            Ok(Some(cursor)) => {
                info!(iteration = self.iteration, cursor, "Status change delivered");
                self.cursor = cursor;
                self.last_error = None;
                IterationOutcome::Notified { cursor }
            }
            Ok(None) => {
                debug!(iteration = self.iteration, "There is no new status");
                self.last_error = None;
                IterationOutcome::NoNewStatus
            }
            Err(e) => {
                let reported = self.report(&e).await;
                IterationOutcome::Failed { error: e, reported }
            }
        }
    }

    /// Runs one iteration, then sleeps for the retry period regardless of
    /// the outcome.
    pub async fn cycle(&mut self) -> IterationOutcome {
        let outcome = self.tick().await;
        self.scheduler.sleep(self.retry_period).await;
        outcome
    }

    /// Repeats [`Self::cycle`] until `shutdown` resolves.
    ///
    /// An in-flight iteration is dropped when shutdown wins the race.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(iterations = self.iteration, "Shutdown requested, stopping poll loop");
                    break;
                }
                _ = self.cycle() => {}
            }
        }
    }

    /// Repeats [`Self::cycle`] forever.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await;
    }

    async fn poll_once(&self) -> Result<Option<i64>> {
        let payload = self.source.fetch(self.cursor).await?;
        let response = validate(&payload)?;

        let Some(record) = response.latest()? else {
            return Ok(None);
        };

        let message = render(&record)?;
        debug!(message = %message, "Message ready to send");
        self.notifier.send(&message).await?;

        Ok(Some(response.current_date))
    }

    /// Logs `err` and forwards it to the chat unless it repeats the last
    /// delivered report. Returns whether a report was delivered.
    async fn report(&mut self, err: &WatchError) -> bool {
        let message = failure_message(err);
        error!(iteration = self.iteration, error = %err, "{message}");

        if !err.is_reported() {
            return false;
        }

        if self.last_error.as_deref() == Some(message.as_str()) {
            debug!("Failure already reported, not repeating");
            return false;
        }

        match self.notifier.send(&message).await {
            Ok(()) => {
                self.last_error = Some(message);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to report failure");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
