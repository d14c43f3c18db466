//! hwwatch core
//!
//! Polls a homework-review API, turns status changes into chat messages,
//! and contains every failure at the iteration boundary.

pub mod config;
pub mod error;
pub mod poll_loop;
pub mod response;
pub mod scheduler;
pub mod service;
pub mod verdict;

pub use config::Config;
pub use error::{MalformedKind, Result, StatusErrorKind, WatchError};
pub use poll_loop::{failure_message, IterationOutcome, PollLoop, STARTUP_MESSAGE};
pub use response::{validate, HomeworkRecord, PollResponse};
pub use scheduler::{Scheduler, TokioScheduler};
pub use service::{HomeworkSource, Notifier};
pub use verdict::{render, HomeworkStatus};
