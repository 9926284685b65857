//! Order status aggregation
//!
//! Once an order is past `accepted`, its status is derived from its lines.

use shared::models::{LineStatus, OrderLine, OrderStatus};

/// Derive the order-level status from line statuses
///
/// Cancelled lines are ignored. No active line left means the order is
/// cancelled.
pub fn aggregate_status(lines: &[OrderLine]) -> OrderStatus {
    aggregate(lines.iter().map(|l| l.status))
}

pub(crate) fn aggregate(statuses: impl IntoIterator<Item = LineStatus>) -> OrderStatus {
    let active: Vec<LineStatus> = statuses
        .into_iter()
        .filter(|s| *s != LineStatus::Cancelled)
        .collect();

    if active.is_empty() {
        return OrderStatus::Cancelled;
    }
    if active.iter().all(|s| *s == LineStatus::Served) {
        return OrderStatus::Served;
    }
    if active
        .iter()
        .all(|s| matches!(s, LineStatus::Ready | LineStatus::Served))
    {
        return OrderStatus::Ready;
    }
    // 有任意一行已开工但未全部出餐
    if active
        .iter()
        .any(|s| matches!(s, LineStatus::Preparing | LineStatus::Ready))
    {
        return OrderStatus::Preparing;
    }
    OrderStatus::Accepted
}
