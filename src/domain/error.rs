//! Validation errors raised at the domain boundary

use thiserror::Error;

/// What went wrong with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field absent or blank
    Missing,
    /// Present but not an acceptable value
    Invalid,
    /// Signature payload is not a usable PNG data URL
    Signature,
}

/// A field failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Wire name of the offending field
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::Invalid,
            field: field.into(),
            message: message.into(),
        }
    }

    /// A required field is absent or blank
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("campo obrigatório: {field}");
        Self {
            kind: ValidationErrorKind::Missing,
            field,
            message,
        }
    }

    /// A signature field carries an unusable image
    pub fn signature(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::Signature,
            field: field.into(),
            message: message.into(),
        }
    }
}
