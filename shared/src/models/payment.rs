//! Payment Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw gateway parameters kept for audit
pub type RawParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("PENDING"),
            PaymentStatus::Success => f.write_str("SUCCESS"),
            PaymentStatus::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Vnpay,
}

/// One online attempt to settle one bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub restaurant_id: String,
    pub bill_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub provider: PaymentProvider,
    /// Globally unique, `{bill_id}_{millis}`
    pub txn_ref: String,
    pub amount_vnd: i64,
    pub status: PaymentStatus,
    #[serde(default)]
    pub provider_transaction_id: Option<String>,
    #[serde(default)]
    pub response_code: Option<String>,
    #[serde(default)]
    pub raw_create_params: RawParams,
    #[serde(default)]
    pub raw_return_params: Option<RawParams>,
    #[serde(default)]
    pub raw_ipn_params: Option<RawParams>,
    pub created_at: i64,
    pub updated_at: i64,
}
