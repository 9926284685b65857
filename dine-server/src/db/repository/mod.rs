//! Repository Module
//!
//! Typed queries over [`Storage`](super::Storage) collections. Every method
//! is scoped by a [`TenantContext`](shared::TenantContext).

pub mod bill;
pub mod catalog;
pub mod dining_table;
pub mod order;
pub mod payment;
pub mod review;
pub mod table_session;

// Re-exports
pub use bill::BillRepository;
pub use catalog::CatalogRepository;
pub use dining_table::DiningTableRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use review::ReviewRepository;
pub use table_session::TableSessionRepository;
