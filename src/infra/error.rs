//! Error types for infraction record infrastructure

use thiserror::Error;

use crate::domain::{InfractionId, ValidationError};

/// Errors that can occur while storing or reading infraction records
#[derive(Error, Debug)]
pub enum InfractionError {
    /// Record failed validation before reaching storage
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No record with the given identifier
    #[error("infraction not found: {0}")]
    NotFound(InfractionId),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for record operations
pub type Result<T> = std::result::Result<T, InfractionError>;
