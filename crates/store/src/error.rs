//! Persistence errors

use cardgate_core::Transient;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    #[error("Concurrent update conflict: {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the persistence layer.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &str, id: impl ToString) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: impl ToString) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        // Local persistence failures are not retried by the pipeline.
        false
    }
}
