//! HTTP status and taxonomy mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Coarse failure taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad, missing or stale QR token; bad gateway signature
    Unauthorized,
    /// Inactive table, wrong role, another subject's resource
    Forbidden,
    /// Unknown id within the caller's scope
    NotFound,
    /// Malformed input, empty cart, non-positive amount, bad paging
    BadRequest,
    /// State-machine precondition violated
    Conflict,
    /// Storage or configuration failure
    Internal,
}

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            _ => match self.kind() {
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Taxonomy bucket for this code
    pub fn kind(&self) -> ErrorKind {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::OrderLineNotFound
            | Self::BillNotFound
            | Self::PaymentNotFound
            | Self::MenuItemNotFound
            | Self::ReviewNotFound
            | Self::TableNotFound
            | Self::SessionNotFound => ErrorKind::NotFound,

            // 409 Conflict
            Self::OrderStatusConflict
            | Self::LineStatusConflict
            | Self::KitchenQueueBusy
            | Self::BillStatusConflict
            | Self::BillAlreadyPaid
            | Self::ReviewDuplicate
            | Self::SessionStatusConflict
            | Self::SessionClosed => ErrorKind::Conflict,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::TokenInvalid
            | Self::QrTokenExpired
            | Self::QrTableMismatch => ErrorKind::Unauthorized,

            // 403 Forbidden
            Self::PermissionDenied | Self::TableInactive | Self::NotResourceOwner => {
                ErrorKind::Forbidden
            }

            // 400 Bad Request
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::OrderEmpty
            | Self::NothingToBill
            | Self::PaymentAmountInvalid
            | Self::MenuItemUnavailable
            | Self::ModifierOptionInvalid
            | Self::RatingOutOfRange
            | Self::NoChanges => ErrorKind::BadRequest,

            // 500 Internal Server Error
            Self::Success
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::SerializationError => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        for code in [
            ErrorCode::TableNotFound,
            ErrorCode::SessionNotFound,
            ErrorCode::OrderLineNotFound,
            ErrorCode::PaymentNotFound,
        ] {
            assert_eq!(code.http_status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::OrderStatusConflict.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::BillAlreadyPaid.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ReviewDuplicate.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(ErrorCode::QrTokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::QrTableMismatch.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(ErrorCode::TableInactive.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotResourceOwner.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(ErrorCode::OrderEmpty.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NothingToBill.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
