//! Request-time errors of the CRUD engine.

use schemaforge_model::{EntityKey, HookError, ValidationErrors};
use schemaforge_storage::StorageError;
use thiserror::Error;

/// Result type for CRUD operations.
pub type CrudResult<T> = Result<T, CrudError>;

#[derive(Debug, Error)]
pub enum CrudError {
    /// No record of the entity has the requested identifier.
    #[error("{key} record '{id}' not found")]
    NotFound { key: EntityKey, id: String },

    /// The payload does not fit the entity's validation shape.
    #[error("invalid payload: {0}")]
    Validation(ValidationErrors),

    /// The storage layer failed (constraint, connectivity, I/O).
    #[error("persistence failure: {0}")]
    Persistence(#[source] StorageError),

    /// Stored data or table layout disagrees with the compiled shape.
    #[error("stored data does not match the compiled shape: {0}")]
    SchemaMismatch(String),

    /// A lifecycle hook rejected or failed the operation.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl CrudError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CrudError::NotFound { .. } => "not_found",
            CrudError::Validation(_) => "validation",
            CrudError::Persistence(_) => "persistence",
            CrudError::SchemaMismatch(_) => "schema_mismatch",
            CrudError::Hook(HookError::Denied(_)) => "denied",
            CrudError::Hook(HookError::Invalid(_)) => "invalid",
            CrudError::Hook(HookError::Failed(_)) => "hook_failed",
        }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CrudError::NotFound { .. }
                | CrudError::Validation(_)
                | CrudError::Hook(HookError::Denied(_) | HookError::Invalid(_))
        )
    }
}

impl From<StorageError> for CrudError {
    fn from(err: StorageError) -> Self {
        if err.is_schema_mismatch() {
            CrudError::SchemaMismatch(err.to_string())
        } else {
            CrudError::Persistence(err)
        }
    }
}

impl From<ValidationErrors> for CrudError {
    fn from(errors: ValidationErrors) -> Self {
        CrudError::Validation(errors)
    }
}
