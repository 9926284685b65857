//! 厨房/服务员侧订单状态机
//!
//! ```text
//! pending ──accept──▶ accepted ──start──▶ preparing ──▶ ready ──send──▶ ready_to_service ──serve──▶ served
//!    │                    └──── line transitions re-derive the order status ────┘
//!    └──reject──▶ cancelled
//! ```
//!
//! Each transition re-reads the order and applies a guarded write. A
//! precondition failure is returned to the caller, never retried here.

use super::status::aggregate_status;
use super::views::{CatalogLookup, build_tickets};
use crate::db::Guarded;
use crate::db::repository::{CatalogRepository, OrderRepository};
use crate::message::Notifier;
use crate::utils::error::status_conflict;
use crate::utils::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use shared::message::{LineStatusPayload, OrderStatusPayload, RealtimeEvent};
use shared::models::{KitchenTicket, LineStatus, Order, OrderStatus};
use shared::util::now_millis;
use shared::TenantContext;
use std::collections::BTreeMap;

/// Result of an order-level transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTransition {
    pub ok: bool,
    pub order_id: i64,
    pub status: OrderStatus,
}

/// Result of a line-level transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTransition {
    pub ok: bool,
    pub order_id: i64,
    pub line_id: u32,
    pub status: LineStatus,
    pub order_status: OrderStatus,
}

impl From<&Order> for OrderTransition {
    fn from(order: &Order) -> Self {
        Self {
            ok: true,
            order_id: order.id,
            status: order.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KitchenService {
    orders: OrderRepository,
    catalog: CatalogRepository,
    notifier: Notifier,
}

impl KitchenService {
    pub fn new(orders: OrderRepository, catalog: CatalogRepository, notifier: Notifier) -> Self {
        Self {
            orders,
            catalog,
            notifier,
        }
    }

    /// Submitted orders, newest first, with live prep time and names
    pub fn list(&self, ctx: &TenantContext, status: Option<OrderStatus>) -> AppResult<Vec<KitchenTicket>> {
        let orders = self.orders.list_submitted(ctx, status)?;
        build_tickets(ctx, &self.catalog, &orders)
    }

    /// pending → accepted
    pub fn accept(&self, ctx: &TenantContext, order_id: i64) -> AppResult<OrderTransition> {
        let now = now_millis();
        let order = self.transition(ctx, order_id, OrderStatus::Pending, "Order is not pending", |o| {
            o.status = OrderStatus::Accepted;
            o.updated_at = now;
        })?;
        tracing::info!(order_id, "order accepted");

        let ticket = CatalogLookup::load(ctx, &self.catalog, [&order])?.ticket(&order);
        let status = status_event(&order, now);
        self.notifier.staff(status.clone());
        self.notifier.kitchen(RealtimeEvent::OrderAccepted(ticket));
        self.notifier.session(&order.session_key, status);

        Ok(OrderTransition::from(&order))
    }

    /// pending → cancelled, every line cancelled
    pub fn reject(&self, ctx: &TenantContext, order_id: i64) -> AppResult<OrderTransition> {
        let now = now_millis();
        let order = self.transition(ctx, order_id, OrderStatus::Pending, "Order is not pending", |o| {
            for line in o.items.iter_mut() {
                line.status = LineStatus::Cancelled;
                line.cancelled_at = Some(now);
            }
            o.status = OrderStatus::Cancelled;
            o.updated_at = now;
        })?;
        tracing::info!(order_id, "order rejected");

        let status = status_event(&order, now);
        self.notifier.staff(status.clone());
        self.notifier.session(&order.session_key, status);
        for line in &order.items {
            self.notifier.session(
                &order.session_key,
                RealtimeEvent::OrderLineStatusChanged(LineStatusPayload {
                    order_id: order.id,
                    line_id: line.id,
                    status: line.status,
                    order_status: order.status,
                    updated_at: now,
                }),
            );
        }

        Ok(OrderTransition::from(&order))
    }

    /// accepted → preparing
    pub fn start_order(&self, ctx: &TenantContext, order_id: i64) -> AppResult<OrderTransition> {
        let now = now_millis();
        let order = self.transition(ctx, order_id, OrderStatus::Accepted, "Order is not accepted", |o| {
            o.status = OrderStatus::Preparing;
            o.updated_at = now;
        })?;

        let status = status_event(&order, now);
        self.notifier.staff(status.clone());
        self.notifier.session(&order.session_key, status);

        Ok(OrderTransition::from(&order))
    }

    /// Line queued → preparing
    pub fn start_line(&self, ctx: &TenantContext, order_id: i64, line_id: u32) -> AppResult<LineTransition> {
        self.line_transition(ctx, order_id, line_id, LineStatus::Queued, LineStatus::Preparing)
    }

    /// Line preparing → ready
    pub fn ready_line(&self, ctx: &TenantContext, order_id: i64, line_id: u32) -> AppResult<LineTransition> {
        self.line_transition(ctx, order_id, line_id, LineStatus::Preparing, LineStatus::Ready)
    }

    /// ready → ready_to_service
    pub fn send_to_waiter(&self, ctx: &TenantContext, order_id: i64) -> AppResult<OrderTransition> {
        let now = now_millis();
        let order = self.transition(ctx, order_id, OrderStatus::Ready, "Order is not ready", |o| {
            o.status = OrderStatus::ReadyToService;
            o.updated_at = now;
        })?;

        self.notifier.staff(status_event(&order, now));
        Ok(OrderTransition::from(&order))
    }

    /// ready_to_service → served; bumps item popularity by served quantity
    pub fn mark_served(&self, ctx: &TenantContext, order_id: i64) -> AppResult<OrderTransition> {
        let now = now_millis();
        let order = self.transition(
            ctx,
            order_id,
            OrderStatus::ReadyToService,
            "Order is not ready to service",
            |o| {
                for line in o.items.iter_mut().filter(|l| l.is_active()) {
                    line.status = LineStatus::Served;
                    line.served_at = Some(now);
                }
                o.status = OrderStatus::Served;
                o.served_at = Some(now);
                o.updated_at = now;
            },
        )?;
        tracing::info!(order_id, "order served");

        self.bump_popularity(ctx, &order);

        let status = status_event(&order, now);
        self.notifier.staff(status.clone());
        self.notifier.session(&order.session_key, status);

        Ok(OrderTransition::from(&order))
    }

    // ========== internals ==========

    fn transition<F>(
        &self,
        ctx: &TenantContext,
        order_id: i64,
        expected: OrderStatus,
        what: &str,
        apply: F,
    ) -> AppResult<Order>
    where
        F: FnOnce(&mut Order),
    {
        match self
            .orders
            .update_if(ctx, order_id, |o| o.status == expected, apply)?
        {
            Guarded::Applied(order) => Ok(order),
            Guarded::Rejected(o) => Err(status_conflict(ErrorCode::OrderStatusConflict, what, o.status)),
            Guarded::Missing => Err(AppError::new(ErrorCode::OrderNotFound)),
        }
    }

    fn line_transition(
        &self,
        ctx: &TenantContext,
        order_id: i64,
        line_id: u32,
        from: LineStatus,
        to: LineStatus,
    ) -> AppResult<LineTransition> {
        let now = now_millis();
        let outcome = self.orders.update_if(
            ctx,
            order_id,
            |o| !o.status.blocks_line_work() && o.line(line_id).is_some_and(|l| l.status == from),
            |o| {
                if let Some(line) = o.line_mut(line_id) {
                    line.status = to;
                    match to {
                        LineStatus::Preparing => line.started_at = Some(now),
                        LineStatus::Ready => line.ready_at = Some(now),
                        _ => {}
                    }
                }
                o.status = aggregate_status(&o.items);
                o.updated_at = now;
            },
        )?;

        let order = match outcome {
            Guarded::Applied(order) => order,
            Guarded::Rejected(o) if o.status.blocks_line_work() => {
                return Err(status_conflict(
                    ErrorCode::OrderStatusConflict,
                    "Order cannot change line status",
                    o.status,
                ));
            }
            Guarded::Rejected(o) => {
                return Err(match o.line(line_id) {
                    None => AppError::new(ErrorCode::OrderLineNotFound),
                    Some(line) => status_conflict(
                        ErrorCode::LineStatusConflict,
                        &format!("Item is not {}", from),
                        line.status,
                    ),
                });
            }
            Guarded::Missing => return Err(AppError::new(ErrorCode::OrderNotFound)),
        };

        tracing::debug!(order_id, line_id, status = %to, order_status = %order.status, "line status changed");

        let line_event = RealtimeEvent::OrderLineStatusChanged(LineStatusPayload {
            order_id: order.id,
            line_id,
            status: to,
            order_status: order.status,
            updated_at: now,
        });
        let status = status_event(&order, now);
        self.notifier.staff(status.clone());
        self.notifier.staff(line_event.clone());
        self.notifier.session(&order.session_key, status);
        self.notifier.session(&order.session_key, line_event);

        Ok(LineTransition {
            ok: true,
            order_id: order.id,
            line_id,
            status: to,
            order_status: order.status,
        })
    }

    /// Best effort: a failed bump is logged and the order stays served
    fn bump_popularity(&self, ctx: &TenantContext, order: &Order) {
        let mut served: BTreeMap<i64, u64> = BTreeMap::new();
        for line in order.items.iter().filter(|l| l.status == LineStatus::Served) {
            *served.entry(line.item_id).or_default() += u64::from(line.qty);
        }
        for (item_id, qty) in served {
            match self.catalog.add_popularity(ctx, item_id, qty) {
                Ok(true) => {}
                Ok(false) => tracing::debug!(item_id, "popularity bump skipped, item gone"),
                Err(e) => tracing::warn!(item_id, error = %e, "popularity bump failed"),
            }
        }
    }
}

fn status_event(order: &Order, at: i64) -> RealtimeEvent {
    RealtimeEvent::OrderStatusChanged(OrderStatusPayload {
        order_id: order.id,
        table_id: order.table_id,
        table_number: order.table_number_snapshot.clone(),
        status: order.status,
        updated_at: at,
    })
}
