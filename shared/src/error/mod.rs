//! Unified error system for the dine-in engine
//!
//! - [`ErrorCode`]: standardized numeric codes for every failure
//! - [`ErrorKind`]: the coarse taxonomy callers branch on
//! - [`AppError`]: error with code, message and structured details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors (QR token, gateway signature)
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Bill and payment errors
//! - 6xxx: Menu and review errors
//! - 7xxx: Table and session errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ErrorKind};
//!
//! let err = AppError::conflict(ErrorCode::OrderStatusConflict, "Order is not pending (current: accepted)")
//!     .with_detail("current", "accepted");
//! assert_eq!(err.kind(), ErrorKind::Conflict);
//! ```

mod codes;
mod http;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use http::ErrorKind;
pub use types::{AppError, AppResult};
