//! 统一错误处理
//!
//! Engine operations return [`AppResult`]. Storage failures become
//! `DatabaseError` and are logged once here, at the conversion point.

pub use shared::error::{AppError, AppResult, ErrorCode, ErrorKind};

use crate::db::StorageError;
use tracing::error;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        error!(error = %err, "storage failure");
        match err {
            StorageError::Serialization(e) => {
                AppError::with_message(ErrorCode::SerializationError, e.to_string())
            }
            other => AppError::database(other.to_string()),
        }
    }
}

/// State-machine conflict naming the current status
pub fn status_conflict(
    code: ErrorCode,
    what: &str,
    current: impl std::fmt::Display,
) -> AppError {
    let current = current.to_string();
    AppError::conflict(code, format!("{} (current: {})", what, current)).with_detail("current", current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_conflict_names_current_status() {
        let err = status_conflict(ErrorCode::OrderStatusConflict, "Order is not pending", "accepted");
        assert_eq!(err.message, "Order is not pending (current: accepted)");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.details.and_then(|d| d.get("current").cloned()),
            Some(serde_json::Value::from("accepted"))
        );
    }
}
