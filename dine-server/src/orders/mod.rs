//! 订单模块
//!
//! - **customer**: QR-scoped draft cart and submit
//! - **kitchen**: staff transitions over orders and lines
//! - **status**: order status derived from line statuses
//! - **pricing**: cart resolution against the live catalog
//! - **views**: read-time joins for kitchen tickets

pub mod customer;
pub mod kitchen;
pub mod pricing;
pub mod status;
pub mod views;

pub use customer::{CustomerOrderService, DraftHandle, DraftUpdateResult, SubmitResult};
pub use kitchen::{KitchenService, LineTransition, OrderTransition};
pub use status::aggregate_status;
pub use views::CatalogLookup;
