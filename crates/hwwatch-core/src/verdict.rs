//! Review status codes and their human-readable verdicts.

use crate::error::{Result, StatusErrorKind, WatchError};
use crate::response::HomeworkRecord;

/// Review status of a homework submission.
///
/// This is the full verdict table: a status string outside these three
/// values is rejected by [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeworkStatus {
    /// The reviewer accepted the work.
    Approved,
    /// The work is being reviewed.
    Reviewing,
    /// The reviewer sent the work back with remarks.
    Rejected,
}

impl HomeworkStatus {
    /// All known statuses.
    pub const ALL: [Self; 3] = [Self::Approved, Self::Reviewing, Self::Rejected];

    /// Parses a status code as sent by the review API. Matching is exact.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "approved" => Some(Self::Approved),
            "reviewing" => Some(Self::Reviewing),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// The status code as sent by the review API.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }

    /// Display text sent to the chat for this status.
    #[must_use]
    pub const fn verdict(&self) -> &'static str {
        match self {
            Self::Approved => "The work has been reviewed: the reviewer liked everything. Hooray!",
            Self::Reviewing => "The work has been taken for review.",
            Self::Rejected => "The work has been reviewed: the reviewer has remarks.",
        }
    }
}

impl std::fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Renders the chat message announcing a status change for `record`.
///
/// The message names the homework, the lesson when the API sent one, and the
/// verdict text.
///
/// # Errors
///
/// Returns `WatchError::InvalidStatus` when `status` or `homework_name` is
/// missing, or when `status` is not a known code.
///
/// # Examples
///
/// ```
/// use hwwatch_core::{render, HomeworkRecord};
///
/// let message = render(&HomeworkRecord::new("Project 1", "reviewing")).unwrap();
/// assert_eq!(
///     message,
///     "Review status changed for \"Project 1\".\nThe work has been taken for review."
/// );
/// ```
pub fn render(record: &HomeworkRecord) -> Result<String> {
    let code = record
        .status
        .as_deref()
        .ok_or_else(|| WatchError::invalid_status(StatusErrorKind::MissingStatus))?;
    let name = record
        .homework_name
        .as_deref()
        .ok_or_else(|| WatchError::invalid_status(StatusErrorKind::MissingName))?;
    let status = HomeworkStatus::from_code(code).ok_or_else(|| {
        WatchError::invalid_status(StatusErrorKind::Unrecognized(code.to_string()))
    })?;

    let mut message = format!("Review status changed for \"{name}\".\n");
    if let Some(lesson) = record.lesson_name.as_deref() {
        message.push_str(lesson);
        message.push('\n');
    }
    message.push_str(status.verdict());
    Ok(message)
}
