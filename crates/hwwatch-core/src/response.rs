//! Review API response types and contract validation.
//!
//! The upstream payload is decoded into a loose [`serde_json::Value`] first
//! so every shape violation maps to a precise [`MalformedKind`] instead of a
//! generic deserialization error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MalformedKind, Result, StatusErrorKind, WatchError};

// ============================================================================
// HomeworkRecord
// ============================================================================

/// Review state of a single submission as reported by the API.
///
/// Every field is optional at this layer; [`crate::verdict::render`] decides
/// which ones are required. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkRecord {
    /// Name of the submitted homework.
    #[serde(default)]
    pub homework_name: Option<String>,

    /// Review status code, e.g. `approved`.
    #[serde(default)]
    pub status: Option<String>,

    /// Lesson the homework belongs to.
    #[serde(default)]
    pub lesson_name: Option<String>,
}

impl HomeworkRecord {
    /// Creates a record with a name and a status.
    #[must_use]
    pub fn new(homework_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            homework_name: Some(homework_name.into()),
            status: Some(status.into()),
            lesson_name: None,
        }
    }

    /// Sets the lesson name.
    #[must_use]
    pub fn with_lesson(mut self, lesson_name: impl Into<String>) -> Self {
        self.lesson_name = Some(lesson_name.into());
        self
    }

    /// Reads a record out of one raw `homeworks` entry.
    ///
    /// Checks run in the same order as [`crate::verdict::render`]: status
    /// present, name present and a string, status a string. A non-string
    /// `lesson_name` is dropped.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::InvalidStatus` for an unusable status or name.
    /// `field` names the entry in a `MalformedResponse` if it is not an
    /// object.
    pub fn from_value(field: &str, value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(wrong_field_type(field, "an object"));
        };
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        let status = match map.get("status") {
            None | Some(Value::Null) => {
                return Err(WatchError::invalid_status(StatusErrorKind::MissingStatus))
            }
            Some(status) => status,
        };
        let homework_name = text("homework_name")
            .ok_or_else(|| WatchError::invalid_status(StatusErrorKind::MissingName))?;
        let status = status.as_str().ok_or_else(|| {
            WatchError::invalid_status(StatusErrorKind::Unrecognized(status.to_string()))
        })?;

        Ok(Self {
            homework_name: Some(homework_name),
            status: Some(status.to_string()),
            lesson_name: text("lesson_name"),
        })
    }
}

// ============================================================================
// PollResponse
// ============================================================================

/// A response from the review-status endpoint whose top-level shape has
/// been checked.
///
/// Entries of `homeworks` are kept as received; only the newest one is ever
/// read, through [`PollResponse::latest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Homework entries changed since the requested cursor, newest first.
    pub homeworks: Vec<Value>,

    /// Cursor to use for the next poll.
    pub current_date: i64,
}

impl PollResponse {
    /// Returns the most recent homework record, if any.
    ///
    /// # Errors
    ///
    /// See [`HomeworkRecord::from_value`].
    pub fn latest(&self) -> Result<Option<HomeworkRecord>> {
        self.homeworks
            .first()
            .map(|entry| HomeworkRecord::from_value("homeworks[0]", entry))
            .transpose()
    }
}

/// Checks a decoded payload against the review API contract.
///
/// The checks run in a fixed order: top-level object, `homeworks` present,
/// `current_date` present, `homeworks` is an array, `current_date` is an
/// integer. The entries of `homeworks` are not inspected here.
///
/// # Errors
///
/// Returns `WatchError::MalformedResponse` describing the first violation.
///
/// # Examples
///
/// ```
/// use hwwatch_core::response::validate;
/// use serde_json::json;
///
/// let response = validate(&json!({"homeworks": [], "current_date": 1_700_000_600})).unwrap();
/// assert!(response.homeworks.is_empty());
/// assert_eq!(response.current_date, 1_700_000_600);
/// ```
pub fn validate(payload: &Value) -> Result<PollResponse> {
    let Value::Object(map) = payload else {
        return Err(WatchError::malformed(MalformedKind::WrongTopLevelType {
            found: json_type_name(payload),
        }));
    };

    let homeworks = map
        .get("homeworks")
        .ok_or_else(|| WatchError::malformed(MalformedKind::MissingField("homeworks")))?;
    let current_date = map
        .get("current_date")
        .ok_or_else(|| WatchError::malformed(MalformedKind::MissingField("current_date")))?;

    let Value::Array(homeworks) = homeworks else {
        return Err(wrong_field_type("homeworks", "an array"));
    };
    let current_date = current_date
        .as_i64()
        .ok_or_else(|| wrong_field_type("current_date", "an integer"))?;

    Ok(PollResponse {
        homeworks: homeworks.clone(),
        current_date,
    })
}

fn wrong_field_type(field: impl Into<String>, expected: &'static str) -> WatchError {
    WatchError::malformed(MalformedKind::WrongFieldType {
        field: field.into(),
        expected,
    })
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
