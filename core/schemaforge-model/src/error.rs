//! Error types for description parsing and entity compilation.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while reading or compiling an entity description.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The description is not valid JSON or does not have the expected shape.
    #[error("malformed entity description: {0}")]
    MalformedDescription(#[from] serde_json::Error),

    /// The description has no (or an empty) `name`.
    #[error("entity description is missing 'name'")]
    MissingName,

    /// A storage or validation shape could not be constructed.
    #[error("cannot compile entity '{entity}': {reason}")]
    Compilation { entity: String, reason: String },

    /// A namespace or entity segment is not usable as a registry key.
    #[error("invalid entity key segment '{0}'")]
    InvalidKey(String),
}

impl ModelError {
    pub(crate) fn compilation(entity: &str, reason: impl Into<String>) -> Self {
        ModelError::Compilation {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the description document itself rather
    /// than by shape construction.
    pub fn is_description_error(&self) -> bool {
        matches!(
            self,
            ModelError::MalformedDescription(_) | ModelError::MissingName
        )
    }
}
