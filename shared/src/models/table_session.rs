//! Table Session Model

use serde::{Deserialize, Serialize};

/// Lifecycle of one table occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Open,
    BillRequested,
    PaymentPending,
    Paid,
    Closed,
}

impl SessionStatus {
    /// Statuses that count as "the table's active session"
    pub const ACTIVE: [SessionStatus; 4] = [
        SessionStatus::Open,
        SessionStatus::BillRequested,
        SessionStatus::PaymentPending,
        SessionStatus::Paid,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Statuses in which a bill may be requested
    pub fn accepts_bill_request(&self) -> bool {
        matches!(
            self,
            SessionStatus::Open | SessionStatus::BillRequested | SessionStatus::PaymentPending
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "OPEN",
            SessionStatus::BillRequested => "BILL_REQUESTED",
            SessionStatus::PaymentPending => "PAYMENT_PENDING",
            SessionStatus::Paid => "PAID",
            SessionStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One continuous occupancy of a table, from QR open to close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSession {
    pub id: i64,
    pub restaurant_id: String,
    pub table_id: i64,
    pub table_number_snapshot: String,
    /// Opaque key: customer pub/sub topic and draft-order scope
    pub session_key: String,
    pub status: SessionStatus,
    pub opened_at: i64,
    #[serde(default)]
    pub bill_requested_at: Option<i64>,
    #[serde(default)]
    pub paid_at: Option<i64>,
    #[serde(default)]
    pub closed_at: Option<i64>,
    #[serde(default)]
    pub active_bill_id: Option<i64>,
}
