//! Shared types for the dine-in coordination engine
//!
//! Types used by the engine and by any transport sitting in front of it:
//! error codes, persisted entity models, operation inputs and the
//! realtime message envelope.

pub mod error;
pub mod message;
pub mod models;
pub mod types;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode, ErrorKind};
pub use message::{BusMessage, RealtimeEvent, Topic};
pub use types::{Actor, SubjectType, TenantContext, Timestamp};
