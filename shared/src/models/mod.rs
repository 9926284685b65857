//! Data models
//!
//! Persisted documents and operation inputs. Every document carries a
//! `restaurant_id` tenant discriminator; ids are `i64` allocated by the
//! engine's storage sequence.

pub mod bill;
pub mod catalog;
pub mod dining_table;
pub mod order;
pub mod payment;
pub mod review;
pub mod table_session;

// Re-exports
pub use bill::*;
pub use catalog::*;
pub use dining_table::*;
pub use order::*;
pub use payment::*;
pub use review::*;
pub use table_session::*;
