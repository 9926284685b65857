//! Order Model
//!
//! An order is one cart/ticket inside a table session. Line prices and names
//! are snapshots taken when the draft is edited and never re-read from the
//! catalog afterwards.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Order-level status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Draft,
    Pending,
    Accepted,
    Preparing,
    Ready,
    ReadyToService,
    Served,
    Cancelled,
}

impl OrderStatus {
    /// Statuses in which the kitchen still owns the order; billing waits
    pub fn is_kitchen_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Accepted
                | OrderStatus::Preparing
                | OrderStatus::Ready
                | OrderStatus::ReadyToService
        )
    }

    /// Statuses in which individual lines may not be advanced
    pub fn blocks_line_work(&self) -> bool {
        matches!(
            self,
            OrderStatus::Draft | OrderStatus::Pending | OrderStatus::Cancelled | OrderStatus::Served
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::ReadyToService => "ready_to_service",
            OrderStatus::Served => "served",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kitchen stage of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    #[default]
    Queued,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl LineStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Queued => "queued",
            LineStatus::Preparing => "preparing",
            LineStatus::Ready => "ready",
            LineStatus::Served => "served",
            LineStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier chosen on a line; the adjustment is the sum over its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineModifier {
    pub group_id: i64,
    pub option_ids: Vec<i64>,
    pub price_adjustment_cents: i64,
}

/// One item entry within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Sequential within the order, starting at 1
    pub id: u32,
    pub item_id: i64,
    pub name_snapshot: String,
    pub unit_price_cents_snapshot: i64,
    pub qty: u32,
    #[serde(default)]
    pub modifiers: Vec<LineModifier>,
    #[serde(default)]
    pub note: Option<String>,
    pub line_total_cents: i64,
    #[serde(default)]
    pub status: LineStatus,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub ready_at: Option<i64>,
    #[serde(default)]
    pub served_at: Option<i64>,
    #[serde(default)]
    pub cancelled_at: Option<i64>,
}

impl OrderLine {
    pub fn is_active(&self) -> bool {
        self.status != LineStatus::Cancelled
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub restaurant_id: String,
    pub table_id: i64,
    pub table_number_snapshot: String,
    pub session_id: i64,
    pub session_key: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    #[serde(default)]
    pub order_note: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<i64>,
    #[serde(default)]
    pub served_at: Option<i64>,
    #[serde(default)]
    pub bill_id: Option<i64>,
    #[serde(default)]
    pub billed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn line(&self, line_id: u32) -> Option<&OrderLine> {
        self.items.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: u32) -> Option<&mut OrderLine> {
        self.items.iter_mut().find(|l| l.id == line_id)
    }

    /// Counts towards a new bill: submitted, not cancelled, not yet billed
    pub fn is_billable(&self) -> bool {
        !matches!(self.status, OrderStatus::Draft | OrderStatus::Cancelled)
            && self.bill_id.is_none()
    }
}

/// Modifier selection sent by the customer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ModifierSelection {
    pub group_id: i64,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub option_ids: Vec<i64>,
}

/// One requested cart line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DraftLineInput {
    pub item_id: i64,
    #[validate(range(min = 1, max = 99))]
    pub qty: u32,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub modifiers: Vec<ModifierSelection>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

/// Full-cart replacement payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DraftItemsInput {
    #[validate(length(max = 50), nested)]
    pub items: Vec<DraftLineInput>,
}

// ==================== Kitchen views ====================
//
// Read-time joins: prep time and display names come from the live catalog
// every time a ticket is rendered. Nothing here is persisted.

/// Display form of one chosen option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDisplay {
    pub option_id: i64,
    pub name: String,
    pub price_adjustment_cents: i64,
}

/// Display form of one modifier on a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDisplay {
    pub group_id: i64,
    pub group_name: Option<String>,
    pub price_adjustment_cents: i64,
    pub options: Vec<OptionDisplay>,
}

/// Line as shown to kitchen and waiters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenLine {
    pub line_id: u32,
    pub item_id: i64,
    pub name: String,
    pub qty: u32,
    pub note: Option<String>,
    pub status: LineStatus,
    pub prep_time_minutes: u32,
    pub line_total_cents: i64,
    pub modifiers: Vec<ModifierDisplay>,
}

/// Order as shown to kitchen and waiters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicket {
    pub order_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub session_id: i64,
    pub status: OrderStatus,
    pub order_note: Option<String>,
    pub total_cents: i64,
    pub submitted_at: Option<i64>,
    pub items: Vec<KitchenLine>,
}
