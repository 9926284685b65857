//! Database Module
//!
//! Embedded redb document store plus typed repositories per collection.

pub mod repository;
pub mod storage;

pub use storage::{Document, Guarded, Storage, StorageError, StorageResult};

use shared::models::{
    Bill, DiningTable, ItemReview, MenuItem, ModifierGroup, ModifierOption, Order, Payment,
    TableSession,
};
use storage::impl_document;

impl_document!(DiningTable, "dining_tables");
impl_document!(TableSession, "table_sessions");
impl_document!(MenuItem, "menu_items");
impl_document!(ModifierGroup, "modifier_groups");
impl_document!(ModifierOption, "modifier_options");
impl_document!(Order, "orders");
impl_document!(Bill, "bills");
impl_document!(Payment, "payments");
impl_document!(ItemReview, "item_reviews");
