//! Error types for phylotrack_io crate.
//!
//! A load either succeeds completely or fails with one of these; the manager
//! being loaded into is never left half rebuilt.

use phylotrack_core::SystematicsError;
use thiserror::Error;

/// Main error type for phylotrack_io operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// CSV encoding or framing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A snapshot row that could not be interpreted
    #[error("Malformed snapshot row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// A required snapshot column is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// The rows parsed but do not form a valid forest
    #[error("Restore error: {0}")]
    Restore(#[from] SystematicsError),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

/// Result type alias for phylotrack_io operations.
pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    /// Creates a new malformed row error. `row` is 1-based, excluding the header.
    #[must_use]
    pub fn malformed<S: Into<String>>(row: usize, reason: S) -> Self {
        Self::MalformedRow {
            row,
            reason: reason.into(),
        }
    }

    /// Creates a new missing column error.
    #[must_use]
    pub fn missing_column<S: Into<String>>(name: S) -> Self {
        Self::MissingColumn(name.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
