//! 实时消息类型定义
//!
//! Envelope and topic types pushed to staff dashboards and customer devices
//! after every committed state transition. The transport (WebSocket, SSE)
//! lives outside the engine and only sees [`BusMessage`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// Delivery channel for a realtime event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// Waiter dashboards
    Waiter,
    /// Kitchen display screens
    Kitchen,
    /// One customer session, keyed by its session key
    Session(String),
    /// Every connected client (table board)
    Broadcast,
}

impl Topic {
    pub fn session(session_key: impl Into<String>) -> Self {
        Topic::Session(session_key.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Waiter => write!(f, "staff:waiter"),
            Topic::Kitchen => write!(f, "staff:kds"),
            Topic::Session(key) => write!(f, "session:{}", key),
            Topic::Broadcast => write!(f, "broadcast"),
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "staff:waiter" => Ok(Topic::Waiter),
            "staff:kds" => Ok(Topic::Kitchen),
            "broadcast" => Ok(Topic::Broadcast),
            other => match other.strip_prefix("session:") {
                Some(key) if !key.is_empty() => Ok(Topic::Session(key.to_string())),
                _ => Err(format!("unknown topic: {}", other)),
            },
        }
    }
}

/// Typed realtime event; serialized as `{"event": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "order.submitted")]
    OrderSubmitted(OrderSubmittedPayload),
    #[serde(rename = "order.accepted")]
    OrderAccepted(crate::models::KitchenTicket),
    #[serde(rename = "order.status_changed")]
    OrderStatusChanged(OrderStatusPayload),
    #[serde(rename = "order.line_status_changed")]
    OrderLineStatusChanged(LineStatusPayload),
    #[serde(rename = "bill.requested")]
    BillRequested(BillRequestedPayload),
    #[serde(rename = "bill.payment_pending")]
    BillPaymentPending(BillPaymentPendingPayload),
    #[serde(rename = "bill.paid")]
    BillPaid(BillPaidPayload),
    #[serde(rename = "bill.accepted")]
    BillAccepted(BillAcceptedPayload),
    #[serde(rename = "bill.rejected")]
    BillRejected(BillRejectedPayload),
    #[serde(rename = "session.closed")]
    SessionClosed(SessionClosedPayload),
    #[serde(rename = "table.status_changed")]
    TableStatusChanged(TableStatusPayload),
}

impl RealtimeEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::OrderSubmitted(_) => "order.submitted",
            RealtimeEvent::OrderAccepted(_) => "order.accepted",
            RealtimeEvent::OrderStatusChanged(_) => "order.status_changed",
            RealtimeEvent::OrderLineStatusChanged(_) => "order.line_status_changed",
            RealtimeEvent::BillRequested(_) => "bill.requested",
            RealtimeEvent::BillPaymentPending(_) => "bill.payment_pending",
            RealtimeEvent::BillPaid(_) => "bill.paid",
            RealtimeEvent::BillAccepted(_) => "bill.accepted",
            RealtimeEvent::BillRejected(_) => "bill.rejected",
            RealtimeEvent::SessionClosed(_) => "session.closed",
            RealtimeEvent::TableStatusChanged(_) => "table.status_changed",
        }
    }
}

/// 消息总线传输单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub id: Uuid,
    pub topic: Topic,
    #[serde(flatten)]
    pub event: RealtimeEvent,
    pub emitted_at: i64,
}

impl BusMessage {
    pub fn new(topic: Topic, event: RealtimeEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            event,
            emitted_at: crate::util::now_millis(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableStatus;

    #[test]
    fn topic_names() {
        assert_eq!(Topic::Waiter.to_string(), "staff:waiter");
        assert_eq!(Topic::Kitchen.to_string(), "staff:kds");
        assert_eq!(Topic::session("ab12").to_string(), "session:ab12");
        assert_eq!(Topic::try_from("session:ab12".to_string()), Ok(Topic::session("ab12")));
        assert!(Topic::try_from("session:".to_string()).is_err());
        assert!(Topic::try_from("staff:bar".to_string()).is_err());
    }

    #[test]
    fn event_serializes_with_wire_name() {
        let event = RealtimeEvent::TableStatusChanged(TableStatusPayload {
            table_id: 3,
            table_number: "T3".into(),
            status: TableStatus::Occupied,
            session_id: Some(9),
        });
        let msg = BusMessage::new(Topic::Broadcast, event.clone());
        let json: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();

        assert_eq!(json["event"], "table.status_changed");
        assert_eq!(json["topic"], "broadcast");
        assert_eq!(json["data"]["status"], "occupied");
        assert_eq!(event.name(), "table.status_changed");

        let back = BusMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
