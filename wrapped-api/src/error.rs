//! Error Types for the Wallet Summary API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use wrapped_core::{ConfigError, LookupError, StorageError, ValidationError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Field format is incorrect (e.g. a malformed account address)
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// No activity summary exists for the account
    AccountNotFound,

    /// Route or resource does not exist
    EntityNotFound,

    // ========================================================================
    // Upstream Errors (408, 500)
    // ========================================================================
    /// The warehouse did not answer within its time budget
    UpstreamTimeout,

    /// The warehouse query failed
    UpstreamError,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Summary store operation failed
    StorageError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::AccountNotFound | ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::UpstreamTimeout => StatusCode::REQUEST_TIMEOUT,

            ErrorCode::UpstreamError | ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::AccountNotFound => "Wallet summary not found",
            ErrorCode::EntityNotFound => "Resource not found",
            ErrorCode::UpstreamTimeout => "Query timed out",
            ErrorCode::UpstreamError => "Error querying wallet data",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Summary store operation failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Invalid {}: {}", field, expected),
        )
    }

    pub fn account_not_found(account: impl fmt::Display) -> Self {
        Self::from_code(ErrorCode::AccountNotFound)
            .with_details(serde_json::json!({ "account": account.to_string() }))
    }

    pub fn upstream_timeout() -> Self {
        Self::from_code(ErrorCode::UpstreamTimeout)
    }

    pub fn upstream_error() -> Self {
        Self::from_code(ErrorCode::UpstreamError)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn storage_error() -> Self {
        Self::from_code(ErrorCode::StorageError)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

/// Upstream and storage details are logged, never returned to the caller.
impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound { account } => ApiError::account_not_found(account),
            LookupError::UpstreamTimeout { reason } => {
                tracing::warn!(reason = %reason, "warehouse timeout");
                ApiError::upstream_timeout()
            }
            LookupError::UpstreamError { reason } => {
                tracing::error!(reason = %reason, "warehouse error");
                ApiError::upstream_error()
            }
            LookupError::Storage(e) => ApiError::from(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Summary store error: {:?}", err);
        ApiError::storage_error()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidAccount { value, reason } => {
                ApiError::invalid_format("account address", &reason)
                    .with_details(serde_json::json!({ "address": value }))
            }
            ValidationError::InvalidValue { field, reason } => {
                ApiError::invalid_input(format!("Invalid value for {}: {}", field, reason))
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::internal_error("Service is misconfigured")
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::internal_error("Failed to encode response")
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidFormat.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::UpstreamTimeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ErrorCode::UpstreamError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::StorageError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_lookup_error_conversion() {
        let err = ApiError::from(LookupError::NotFound {
            account: "GABC".into(),
        });
        assert_eq!(err.code, ErrorCode::AccountNotFound);
        assert_eq!(err.details, Some(serde_json::json!({ "account": "GABC" })));

        let err = ApiError::from(LookupError::UpstreamTimeout {
            reason: "Query timed out".into(),
        });
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);

        let err = ApiError::from(LookupError::UpstreamError {
            reason: "secret internal detail".into(),
        });
        assert_eq!(err.code, ErrorCode::UpstreamError);
        assert!(!err.message.contains("secret"));

        let err = ApiError::from(LookupError::Storage(StorageError::LockPoisoned));
        assert_eq!(err.code, ErrorCode::StorageError);
    }

    #[test]
    fn test_validation_error_conversion() {
        let err = ApiError::from(ValidationError::InvalidAccount {
            value: "GSHORT".into(),
            reason: "must be exactly 56 characters long".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("56"));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::upstream_timeout();
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("UPSTREAM_TIMEOUT"));
        assert!(!json.contains("details"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::internal_error("boom");
        let display = format!("{}", err);
        assert!(display.contains("InternalError"));
        assert!(display.contains("boom"));
    }
}
