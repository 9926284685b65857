//! Error type shared by every engine operation

use super::codes::ErrorCode;
use super::http::ErrorKind;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (current status, field, ids)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Get the taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a not authenticated error
    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    /// Create a state conflict error under a specific code
    pub fn conflict(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::with_message(code, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        Self::validation(format!("Invalid input: {}", errors)).with_detail("fields", fields)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::OrderEmpty);
        assert_eq!(err.code, ErrorCode::OrderEmpty);
        assert_eq!(err.message, "Cart is empty");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::conflict(
            ErrorCode::OrderStatusConflict,
            "Order is not pending (current: accepted)",
        )
        .with_detail("current", "accepted");

        assert_eq!(err.kind(), ErrorKind::Conflict);
        let details = err.details.unwrap();
        assert_eq!(details.get("current"), Some(&Value::from("accepted")));
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        assert_eq!(AppError::validation("x").kind(), ErrorKind::BadRequest);
        assert_eq!(AppError::invalid_request("x").kind(), ErrorKind::BadRequest);
        assert_eq!(AppError::not_found("Bill").message, "Bill not found");
        assert_eq!(AppError::not_authenticated().kind(), ErrorKind::Unauthorized);
        assert_eq!(AppError::forbidden("x").kind(), ErrorKind::Forbidden);
        assert_eq!(AppError::database("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::BillNotFound, "Bill 7 not found");
        assert_eq!(err.to_string(), "Bill 7 not found");
    }
}
