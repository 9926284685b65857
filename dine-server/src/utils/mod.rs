//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] - 应用错误类型 (from shared::error)
//! - 日志初始化
//! - 业务时区工具

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResult, ErrorCode, ErrorKind};
