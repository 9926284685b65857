//! Bill Model

use crate::types::SubjectType;
use serde::{Deserialize, Serialize};

/// Bill lifecycle
///
/// `Settled` is the archive state written when staff accepts a paid bill and
/// closes the session. `Rejected` is a bill staff refused before payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    #[default]
    Requested,
    PaymentPending,
    Paid,
    Settled,
    Rejected,
}

impl BillStatus {
    /// Statuses a payment may still be applied to
    pub fn is_open(&self) -> bool {
        matches!(self, BillStatus::Requested | BillStatus::PaymentPending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BillStatus::Settled | BillStatus::Rejected)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Requested => "REQUESTED",
            BillStatus::PaymentPending => "PAYMENT_PENDING",
            BillStatus::Paid => "PAID",
            BillStatus::Settled => "SETTLED",
            BillStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a bill was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("CASH"),
            PaymentMethod::Online => f.write_str("ONLINE"),
        }
    }
}

/// Settlement unit aggregating orders of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub restaurant_id: String,
    pub session_id: i64,
    pub session_key: String,
    pub table_id: i64,
    pub table_number_snapshot: String,
    pub order_ids: Vec<i64>,
    pub status: BillStatus,
    /// Fixed at creation
    pub total_cents: i64,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub customer_subject_type: Option<SubjectType>,
    #[serde(default)]
    pub customer_subject_id: Option<String>,
    pub requested_at: i64,
    #[serde(default)]
    pub paid_at: Option<i64>,
    #[serde(default)]
    pub settled_at: Option<i64>,
    #[serde(default)]
    pub rejected_at: Option<i64>,
    #[serde(default)]
    pub reject_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
