//! Structured API error responses with error codes
//!
//! Every failure leaves the HTTP surface as the same envelope the success
//! path uses (`success` + `message`), with a machine-readable `error` object
//! attached for clients that branch on codes.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{ValidationError, ValidationErrorKind};
use crate::infra::InfractionError;

/// Message shown to the user when a record could not be stored
pub const SAVE_FAILED_MESSAGE: &str = "Erro ao salvar os dados";

/// Message shown to the user when a record could not be read
pub const LOAD_FAILED_MESSAGE: &str = "Erro ao carregar os dados";

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Required field is missing
    MissingRequiredField,
    /// Field value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    /// Infraction record not found
    RecordNotFound,

    // Signature errors (6xxx)
    /// Signature is not a decodable PNG data URL
    InvalidSignature,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Validation (3xxx)
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFieldValue => 3003,

            // Resource (4xxx)
            ErrorCode::RecordNotFound => 4002,

            // Signature (6xxx)
            ErrorCode::InvalidSignature => 6001,

            // Infrastructure (8xxx)
            ErrorCode::DatabaseError => 8001,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidSignature => StatusCode::BAD_REQUEST,

            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `false`; mirrors the success envelope
    pub success: bool,

    /// Message suitable for showing to the user
    pub message: String,

    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Additional error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                details: None,
                resource_id: None,
            },
        }
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Set related resource ID
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match err.kind {
            ValidationErrorKind::Missing => ErrorCode::MissingRequiredField,
            ValidationErrorKind::Signature => ErrorCode::InvalidSignature,
            ValidationErrorKind::Invalid => ErrorCode::InvalidFieldValue,
        };

        ApiError::new(code, err.to_string()).with_details(serde_json::json!({
            "field": err.field,
            "reason": err.message,
        }))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(
            ErrorCode::InvalidRequestBody,
            format!("Corpo da requisição inválido: {}", rejection.body_text()),
        )
    }
}

impl From<InfractionError> for ApiError {
    fn from(err: InfractionError) -> Self {
        match err {
            InfractionError::Validation(e) => e.into(),
            InfractionError::NotFound(id) => record_not_found(id),
            InfractionError::Database(e) => {
                error!(error = %e, "database operation failed");
                ApiError::new(ErrorCode::DatabaseError, SAVE_FAILED_MESSAGE)
            }
            InfractionError::Configuration(msg) | InfractionError::Internal(msg) => {
                error!(error = %msg, "internal error");
                ApiError::new(ErrorCode::InternalError, SAVE_FAILED_MESSAGE)
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a not found error for an infraction record
pub fn record_not_found(id: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        ErrorCode::RecordNotFound,
        format!("Auto de infração não encontrado: {}", id),
    )
    .with_resource_id(id.to_string())
}

/// Map a read-path failure, logging the cause and hiding it from the client
pub fn load_failed(err: InfractionError) -> ApiError {
    match err {
        InfractionError::NotFound(id) => record_not_found(id),
        other => {
            error!(error = %other, "failed to load infraction");
            ApiError::new(ErrorCode::DatabaseError, LOAD_FAILED_MESSAGE)
        }
    }
}

/// Create an internal error
pub fn internal_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InternalError, message.into())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InfractionId;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::InvalidRequestBody.numeric_code(), 3001);
        assert_eq!(ErrorCode::MissingRequiredField.numeric_code(), 3002);
        assert_eq!(ErrorCode::RecordNotFound.numeric_code(), 4002);
        assert_eq!(ErrorCode::InvalidSignature.numeric_code(), 6001);
        assert_eq!(ErrorCode::DatabaseError.numeric_code(), 8001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidRequestBody.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidSignature.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RecordNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DatabaseError.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_mapping() {
        let missing: ApiError = ValidationError::missing("nome").into();
        assert_eq!(missing.code(), ErrorCode::MissingRequiredField);
        assert_eq!(missing.error.details.as_ref().unwrap()["field"], "nome");

        let signature: ApiError = ValidationError::signature("assinatura", "PNG inválido").into();
        assert_eq!(signature.code(), ErrorCode::InvalidSignature);

        // Classification follows the kind, not the field name or wording
        let reworded = ValidationError {
            message: "preencha o nome".to_string(),
            ..ValidationError::missing("nome")
        };
        let reworded: ApiError = reworded.into();
        assert_eq!(reworded.code(), ErrorCode::MissingRequiredField);

        let missing_signature: ApiError = ValidationError::missing("assinatura").into();
        assert_eq!(missing_signature.code(), ErrorCode::MissingRequiredField);

        let plain: ApiError = ValidationError::new("assinaturaAgente", "texto").into();
        assert_eq!(plain.code(), ErrorCode::InvalidFieldValue);

        let value: ApiError = ValidationError::new("serie", "série inválida").into();
        assert_eq!(value.code(), ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn test_storage_errors_use_generic_message() {
        let err: ApiError = InfractionError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.message, SAVE_FAILED_MESSAGE);
        assert!(!err.success);

        let err: ApiError = InfractionError::Internal("boom".into()).into();
        assert_eq!(err.message, SAVE_FAILED_MESSAGE);
    }

    #[test]
    fn test_load_failed_keeps_not_found() {
        let err = load_failed(InfractionError::NotFound(InfractionId(7)));
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
        assert_eq!(err.error.resource_id.as_deref(), Some("7"));

        let err = load_failed(InfractionError::Database(sqlx::Error::PoolClosed));
        assert_eq!(err.message, LOAD_FAILED_MESSAGE);
    }

    #[test]
    fn test_error_serialization() {
        let error = record_not_found(42);
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "RECORD_NOT_FOUND");
        assert_eq!(json["error"]["numeric_code"], 4002);
        assert!(json["message"].as_str().unwrap().contains("42"));
    }

    #[test]
    fn test_into_response_sets_header() {
        let response = ApiError::new(ErrorCode::InvalidRequestBody, "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("x-error-code").unwrap(),
            "INVALID_REQUEST_BODY"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ErrorCode::RecordNotFound.to_string(), "RECORD_NOT_FOUND");
        assert_eq!(ErrorCode::InvalidSignature.to_string(), "INVALID_SIGNATURE");
    }
}
