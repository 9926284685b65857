//! Error codes for the dine-in engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Bill and payment errors
//! - 6xxx: Menu and review errors
//! - 7xxx: Table and session errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller identity is missing
    NotAuthenticated = 1001,
    /// Token could not be decoded or verified
    TokenInvalid = 1004,
    /// QR code was rotated after it was printed
    QrTokenExpired = 1010,
    /// QR token was issued for another table
    QrTableMismatch = 1011,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Table is disabled
    TableInactive = 2010,
    /// Resource belongs to another subject
    NotResourceOwner = 2011,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order line not found
    OrderLineNotFound = 4006,
    /// Draft has no lines
    OrderEmpty = 4007,
    /// Order is not in the required status
    OrderStatusConflict = 4010,
    /// Order line is not in the required status
    LineStatusConflict = 4011,
    /// Session still has orders in the kitchen
    KitchenQueueBusy = 4012,

    // ==================== 5xxx: Bill / Payment ====================
    /// Bill not found
    BillNotFound = 5001,
    /// Bill is not in the required status
    BillStatusConflict = 5002,
    /// Nothing left to bill
    NothingToBill = 5003,
    /// Bill has already been paid
    BillAlreadyPaid = 5004,
    /// Payment not found
    PaymentNotFound = 5101,
    /// Payment amount is not positive
    PaymentAmountInvalid = 5102,

    // ==================== 6xxx: Menu / Review ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item cannot be ordered
    MenuItemUnavailable = 6002,
    /// Modifier option is unknown, inactive or outside its group
    ModifierOptionInvalid = 6003,
    /// Review not found
    ReviewNotFound = 6101,
    /// Subject already reviewed this item
    ReviewDuplicate = 6102,
    /// Rating outside 1..=5
    RatingOutOfRange = 6103,
    /// Patch contains no changes
    NoChanges = 6104,

    // ==================== 7xxx: Table / Session ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table session not found
    SessionNotFound = 7101,
    /// Session is not in the required status
    SessionStatusConflict = 7102,
    /// Session is already closed
    SessionClosed = 7103,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Serialization error
    SerializationError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenInvalid => "Invalid QR token",
            ErrorCode::QrTokenExpired => "QR is expired",
            ErrorCode::QrTableMismatch => "QR token does not match table",

            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::TableInactive => "Table is inactive",
            ErrorCode::NotResourceOwner => "Resource belongs to another user",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderLineNotFound => "Order item not found",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::OrderStatusConflict => "Order is not in the required status",
            ErrorCode::LineStatusConflict => "Order item is not in the required status",
            ErrorCode::KitchenQueueBusy => "Orders are still being processed",

            ErrorCode::BillNotFound => "Bill not found",
            ErrorCode::BillStatusConflict => "Bill is not in the required status",
            ErrorCode::NothingToBill => "No billable orders",
            ErrorCode::BillAlreadyPaid => "Bill already paid",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentAmountInvalid => "Invalid bill amount",

            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",
            ErrorCode::ModifierOptionInvalid => "Invalid modifier option",
            ErrorCode::ReviewNotFound => "Review not found",
            ErrorCode::ReviewDuplicate => "You already reviewed this item. Please edit your review.",
            ErrorCode::RatingOutOfRange => "Rating must be between 1 and 5",
            ErrorCode::NoChanges => "No changes",

            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::SessionNotFound => "Session not found",
            ErrorCode::SessionStatusConflict => "Session is not in the required status",
            ErrorCode::SessionClosed => "Session already closed",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SerializationError => "Serialization error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 value doesn't match any known ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1004 => Ok(ErrorCode::TokenInvalid),
            1010 => Ok(ErrorCode::QrTokenExpired),
            1011 => Ok(ErrorCode::QrTableMismatch),

            2001 => Ok(ErrorCode::PermissionDenied),
            2010 => Ok(ErrorCode::TableInactive),
            2011 => Ok(ErrorCode::NotResourceOwner),

            4001 => Ok(ErrorCode::OrderNotFound),
            4006 => Ok(ErrorCode::OrderLineNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4010 => Ok(ErrorCode::OrderStatusConflict),
            4011 => Ok(ErrorCode::LineStatusConflict),
            4012 => Ok(ErrorCode::KitchenQueueBusy),

            5001 => Ok(ErrorCode::BillNotFound),
            5002 => Ok(ErrorCode::BillStatusConflict),
            5003 => Ok(ErrorCode::NothingToBill),
            5004 => Ok(ErrorCode::BillAlreadyPaid),
            5101 => Ok(ErrorCode::PaymentNotFound),
            5102 => Ok(ErrorCode::PaymentAmountInvalid),

            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemUnavailable),
            6003 => Ok(ErrorCode::ModifierOptionInvalid),
            6101 => Ok(ErrorCode::ReviewNotFound),
            6102 => Ok(ErrorCode::ReviewDuplicate),
            6103 => Ok(ErrorCode::RatingOutOfRange),
            6104 => Ok(ErrorCode::NoChanges),

            7001 => Ok(ErrorCode::TableNotFound),
            7101 => Ok(ErrorCode::SessionNotFound),
            7102 => Ok(ErrorCode::SessionStatusConflict),
            7103 => Ok(ErrorCode::SessionClosed),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9004 => Ok(ErrorCode::SerializationError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
