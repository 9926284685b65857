//! Realtime event payloads
//!
//! Field names are stable: dashboards match on them.

use crate::models::{BillStatus, LineStatus, OrderStatus, PaymentMethod, SessionStatus, TableStatus};
use serde::{Deserialize, Serialize};

// ==================== Orders ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmittedPayload {
    pub order_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub order_note: Option<String>,
    pub submitted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusPayload {
    pub order_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub status: OrderStatus,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStatusPayload {
    pub order_id: i64,
    pub line_id: u32,
    pub status: LineStatus,
    pub order_status: OrderStatus,
    pub updated_at: i64,
}

// ==================== Bills ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRequestedPayload {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub status: BillStatus,
    pub total_cents: i64,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPaymentPendingPayload {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub total_cents: i64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPaidPayload {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_number: String,
    pub status: BillStatus,
    pub method: PaymentMethod,
    pub total_cents: i64,
    pub paid_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillAcceptedPayload {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub table_number: String,
    pub total_cents: i64,
    pub method: Option<PaymentMethod>,
    pub settled_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRejectedPayload {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_number: String,
    pub reason: Option<String>,
    pub rejected_at: i64,
}

// ==================== Sessions / Tables ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClosedPayload {
    pub session_id: i64,
    pub table_number: String,
    pub status: SessionStatus,
    pub closed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatusPayload {
    pub table_id: i64,
    pub table_number: String,
    pub status: TableStatus,
    pub session_id: Option<i64>,
}
