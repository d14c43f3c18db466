//! Error types for the hwwatch poll loop.
//!
//! This module defines the error hierarchy for every step of a polling
//! iteration: configuration loading, the upstream review API call, response
//! validation, status rendering, and outbound notification.

/// A specialized `Result` type for hwwatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while running the homework watcher.
///
/// Configuration errors are fatal and only surface at startup. Every other
/// variant is contained at the iteration boundary of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A required environment variable is absent or blank.
    #[error("Required configuration '{key}' not found\n\nSuggestion: Set {key} in the environment or in your .env file")]
    ConfigurationMissing {
        /// Name of the missing environment variable.
        key: String,
    },

    /// An optional configuration value is present but unusable.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Upstream Errors
    // ========================================================================
    /// The review API answered with a non-success HTTP status.
    #[error("Endpoint {endpoint} not available (HTTP {status})")]
    EndpointUnavailable {
        /// URL of the review-status endpoint.
        endpoint: String,
        /// HTTP status code returned.
        status: u16,
    },

    /// The request to the review API failed at the network level.
    #[error("Request to review API failed: {message}")]
    TransportFailure {
        /// Description of the transport error.
        message: String,
    },

    /// The review API body was not valid JSON.
    #[error("Failed to decode review API response: {message}")]
    DecodeFailure {
        /// Description of the decode error.
        message: String,
    },

    // ========================================================================
    // Contract Errors
    // ========================================================================
    /// The decoded response does not match the expected shape.
    #[error("Malformed review API response: {kind}")]
    MalformedResponse {
        /// Which part of the contract was violated.
        kind: MalformedKind,
    },

    /// A homework record cannot be rendered into a verdict.
    #[error("Invalid homework record: {kind}")]
    InvalidStatus {
        /// Which check the record failed.
        kind: StatusErrorKind,
    },

    // ========================================================================
    // Notification Errors
    // ========================================================================
    /// The messaging API call failed.
    #[error("Message not sent: {message}")]
    NotifyFailure {
        /// Description of the delivery failure.
        message: String,
    },
}

/// Ways a decoded response can violate the expected contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    /// The top-level value is not a JSON object.
    WrongTopLevelType {
        /// JSON type that was received instead.
        found: &'static str,
    },
    /// A required key is absent.
    MissingField(&'static str),
    /// A key is present but holds the wrong JSON type.
    WrongFieldType {
        /// Path of the offending field, e.g. `homeworks` or `homeworks[0]`.
        field: String,
        /// Type that was expected.
        expected: &'static str,
    },
}

impl std::fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongTopLevelType { found } => {
                write!(f, "wrong top-level type: expected object, found {found}")
            }
            Self::MissingField(field) => write!(f, "missing field '{field}'"),
            Self::WrongFieldType { field, expected } => {
                write!(f, "wrong field type: '{field}' must be {expected}")
            }
        }
    }
}

/// Ways a homework record can fail status rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusErrorKind {
    /// The record has no `status`.
    MissingStatus,
    /// The record has no `homework_name`.
    MissingName,
    /// The `status` is not one of the known review states.
    Unrecognized(String),
}

impl std::fmt::Display for StatusErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStatus => write!(f, "missing status"),
            Self::MissingName => write!(f, "missing name"),
            Self::Unrecognized(status) => write!(f, "unrecognized status value '{status}'"),
        }
    }
}

impl WatchError {
    /// Creates a new `ConfigurationMissing` error.
    #[must_use]
    pub fn config_missing(key: impl Into<String>) -> Self {
        Self::ConfigurationMissing { key: key.into() }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `EndpointUnavailable` error.
    #[must_use]
    pub fn endpoint_unavailable(endpoint: impl Into<String>, status: u16) -> Self {
        Self::EndpointUnavailable {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a new `TransportFailure` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    /// Creates a new `DecodeFailure` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub const fn malformed(kind: MalformedKind) -> Self {
        Self::MalformedResponse { kind }
    }

    /// Creates a new `InvalidStatus` error.
    #[must_use]
    pub const fn invalid_status(kind: StatusErrorKind) -> Self {
        Self::InvalidStatus { kind }
    }

    /// Creates a new `NotifyFailure` error.
    #[must_use]
    pub fn notify(message: impl Into<String>) -> Self {
        Self::NotifyFailure {
            message: message.into(),
        }
    }

    /// Returns `true` if this error must stop the process at startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing { .. } | Self::ConfigValidationError { .. }
        )
    }

    /// Severity label attached to the log line for this error.
    ///
    /// `tracing` tops out at `ERROR`, so fatal errors carry `critical` as a
    /// field instead.
    #[must_use]
    pub const fn severity(&self) -> &'static str {
        if self.is_fatal() {
            "critical"
        } else {
            "error"
        }
    }

    /// Returns `true` if this error should be forwarded through the notifier.
    ///
    /// Notification failures are only logged: reporting them through the
    /// channel that just failed would recurse.
    #[must_use]
    pub const fn is_reported(&self) -> bool {
        !matches!(self, Self::NotifyFailure { .. }) && !self.is_fatal()
    }
}
