//! Error types for Coursework

use thiserror::Error;

/// Result type alias using Coursework Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coursework error types
///
/// Every variant is recoverable: a failed tracker operation leaves the
/// previously committed state untouched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Assignment {assignment} is already released for course {course}")]
    DuplicateRelease { course: String, assignment: String },

    #[error("Assignment {assignment} has not been released for course {course}")]
    NotReleased { course: String, assignment: String },

    #[error("Assignment {assignment} has not been fetched for course {course}")]
    NotFetched { course: String, assignment: String },

    #[error("Fetch destination already exists and is not empty: {}", path.display())]
    DestinationExists { path: std::path::PathBuf },

    #[error("Unknown assignment {assignment} in course {course}")]
    UnknownAssignment { course: String, assignment: String },

    #[error("Assignment {assignment} has no item named {item}")]
    UnknownItem { assignment: String, item: String },

    #[error("Invalid {what} name {name:?}: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("{operation} did not complete within {millis}ms")]
    CollaboratorTimeout { operation: String, millis: u64 },

    #[error("Operation timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Short machine-readable kind, used by front ends for failed-action notices
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DuplicateRelease { .. } => "duplicate_release",
            Error::NotReleased { .. } => "not_released",
            Error::NotFetched { .. } => "not_fetched",
            Error::DestinationExists { .. } => "destination_exists",
            Error::UnknownAssignment { .. } => "unknown_assignment",
            Error::UnknownItem { .. } => "unknown_item",
            Error::InvalidName { .. } => "invalid_name",
            Error::CollaboratorTimeout { .. } => "collaborator_timeout",
            Error::Timeout { .. } => "timeout",
            Error::Exchange(_) => "exchange",
            Error::Io(_) => "io",
            Error::Database(_) => "database",
            Error::Serialization(_) => "serialization",
            Error::InvalidConfig(_) => "invalid_config",
        }
    }
}
