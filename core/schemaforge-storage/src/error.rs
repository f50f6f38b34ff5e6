//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The table does not match the compiled storage shape
    /// (a column the shape expects is missing).
    #[error("table out of date with compiled shape: {0}")]
    SchemaDrift(String),

    /// A stored value cannot be read back as its column's storage kind.
    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// A value handed to the store does not fit its column.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session has already released its connection.
    #[error("session closed")]
    SessionClosed,
}

impl StorageError {
    /// True when stored data or table layout disagrees with the compiled
    /// shape, as opposed to a connectivity or constraint failure.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, StorageError::SchemaDrift(_) | StorageError::Decode { .. })
    }

    /// Splits out the SQLite failures that mean the table layout drifted.
    pub(crate) fn classify(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("no such column") || message.contains("has no column named") {
            StorageError::SchemaDrift(message)
        } else {
            StorageError::Database(err)
        }
    }
}
