//! 桌台会话管理
//!
//! A session is one continuous occupancy of a table. It is the anchor the
//! order and bill flows join on.

mod manager;

pub use manager::{CloseSessionResult, TableSessionManager, generate_session_key};
