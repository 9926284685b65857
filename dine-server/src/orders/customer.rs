//! 顾客点餐流程
//!
//! Every call is scoped by `(table_id, token)`: the token is verified and
//! the table's active session resolved first, then the order must belong to
//! that session.

use super::pricing::{order_total, price_lines};
use crate::db::Guarded;
use crate::db::repository::{CatalogRepository, OrderRepository};
use crate::message::Notifier;
use crate::sessions::TableSessionManager;
use crate::utils::error::status_conflict;
use crate::utils::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use shared::message::{OrderSubmittedPayload, RealtimeEvent};
use shared::models::{
    DraftItemsInput, LineStatus, Order, OrderStatus, TableSession,
};
use shared::util::now_millis;
use shared::TenantContext;
use validator::Validate;

/// Handle to the session's draft cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftHandle {
    pub order_id: i64,
    pub status: OrderStatus,
    pub session_id: i64,
    pub session_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdateResult {
    pub ok: bool,
    pub order_id: i64,
    pub subtotal_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub ok: bool,
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct CustomerOrderService {
    sessions: TableSessionManager,
    orders: OrderRepository,
    catalog: CatalogRepository,
    notifier: Notifier,
}

impl CustomerOrderService {
    pub fn new(
        sessions: TableSessionManager,
        orders: OrderRepository,
        catalog: CatalogRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            sessions,
            orders,
            catalog,
            notifier,
        }
    }

    /// Return the session's draft, creating an empty one if there is none
    pub fn open_draft(&self, ctx: &TenantContext, table_id: i64, token: &str) -> AppResult<DraftHandle> {
        let session = self.sessions.open_or_get_active(ctx, table_id, token)?;

        let draft = match self
            .orders
            .find_draft(ctx, table_id, session.id, &session.session_key)?
        {
            Some(existing) => existing,
            None => {
                let now = now_millis();
                let created = self.orders.create(Order {
                    id: 0,
                    restaurant_id: ctx.restaurant_id.clone(),
                    table_id,
                    table_number_snapshot: session.table_number_snapshot.clone(),
                    session_id: session.id,
                    session_key: session.session_key.clone(),
                    status: OrderStatus::Draft,
                    items: Vec::new(),
                    subtotal_cents: 0,
                    total_cents: 0,
                    order_note: None,
                    submitted_at: None,
                    served_at: None,
                    bill_id: None,
                    billed_at: None,
                    created_at: now,
                    updated_at: now,
                })?;
                tracing::debug!(order_id = created.id, session_id = session.id, "draft order created");
                created
            }
        };

        Ok(DraftHandle {
            order_id: draft.id,
            status: draft.status,
            session_id: session.id,
            session_key: session.session_key,
        })
    }

    /// Replace the whole cart of a draft order
    pub fn update_draft_items(
        &self,
        ctx: &TenantContext,
        order_id: i64,
        table_id: i64,
        token: &str,
        input: DraftItemsInput,
    ) -> AppResult<DraftUpdateResult> {
        input.validate()?;
        let session = self.sessions.open_or_get_active(ctx, table_id, token)?;

        // 1. Resolve against the live catalog
        let item_ids: Vec<i64> = input.items.iter().map(|l| l.item_id).collect();
        let option_ids: Vec<i64> = input
            .items
            .iter()
            .flat_map(|l| l.modifiers.iter())
            .flat_map(|m| m.option_ids.iter().copied())
            .collect();
        let items = self.catalog.items_by_ids(ctx, &item_ids)?;
        let options = if option_ids.is_empty() {
            Default::default()
        } else {
            self.catalog.options_by_ids(ctx, &option_ids)?
        };
        let lines = price_lines(&input.items, &items, &options)?;
        let total = order_total(&lines);

        // 2. Guarded replace: still a draft of this session
        let now = now_millis();
        let outcome = self.orders.update_if(
            ctx,
            order_id,
            |o| owned_by(o, table_id, &session) && o.status == OrderStatus::Draft,
            |o| {
                o.items = lines;
                o.subtotal_cents = total;
                o.total_cents = total;
                o.updated_at = now;
            },
        )?;

        match outcome {
            Guarded::Applied(order) => Ok(DraftUpdateResult {
                ok: true,
                order_id: order.id,
                subtotal_cents: order.subtotal_cents,
                total_cents: order.total_cents,
            }),
            Guarded::Rejected(o) if owned_by(&o, table_id, &session) => Err(status_conflict(
                ErrorCode::OrderStatusConflict,
                "Order is not a draft",
                o.status,
            )),
            _ => Err(AppError::new(ErrorCode::OrderNotFound)),
        }
    }

    /// Send the draft to the kitchen
    pub fn submit(
        &self,
        ctx: &TenantContext,
        order_id: i64,
        table_id: i64,
        token: &str,
        order_note: Option<String>,
    ) -> AppResult<SubmitResult> {
        let session = self.sessions.open_or_get_active(ctx, table_id, token)?;
        let note = order_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let now = now_millis();
        let outcome = self.orders.update_if(
            ctx,
            order_id,
            |o| {
                owned_by(o, table_id, &session)
                    && o.status == OrderStatus::Draft
                    && !o.items.is_empty()
            },
            |o| {
                for line in o.items.iter_mut() {
                    if line.status != LineStatus::Cancelled {
                        line.status = LineStatus::Queued;
                    }
                }
                o.status = OrderStatus::Pending;
                o.submitted_at = Some(now);
                o.order_note = note;
                o.updated_at = now;
            },
        )?;

        let order = match outcome {
            Guarded::Applied(order) => order,
            Guarded::Rejected(o) if owned_by(&o, table_id, &session) => {
                return Err(if o.status != OrderStatus::Draft {
                    status_conflict(ErrorCode::OrderStatusConflict, "Order is not a draft", o.status)
                } else {
                    AppError::new(ErrorCode::OrderEmpty)
                });
            }
            _ => return Err(AppError::new(ErrorCode::OrderNotFound)),
        };

        tracing::info!(
            order_id = order.id,
            session_id = order.session_id,
            total_cents = order.total_cents,
            "order submitted"
        );

        self.notifier
            .waiter(RealtimeEvent::OrderSubmitted(OrderSubmittedPayload {
                order_id: order.id,
                session_id: order.session_id,
                table_id: order.table_id,
                table_number: order.table_number_snapshot.clone(),
                status: order.status,
                total_cents: order.total_cents,
                order_note: order.order_note.clone(),
                submitted_at: now,
            }));

        Ok(SubmitResult {
            ok: true,
            order_id: order.id,
            status: order.status,
        })
    }

    /// The session's submitted orders, newest first
    pub fn list_my_orders(&self, ctx: &TenantContext, table_id: i64, token: &str) -> AppResult<Vec<Order>> {
        let session = self.sessions.open_or_get_active(ctx, table_id, token)?;
        let mut orders: Vec<Order> = self
            .orders
            .list_by_session(ctx, session.id)?
            .into_iter()
            .filter(|o| o.table_id == table_id && o.status != OrderStatus::Draft)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    pub fn get_my_order(
        &self,
        ctx: &TenantContext,
        order_id: i64,
        table_id: i64,
        token: &str,
    ) -> AppResult<Order> {
        let session = self.sessions.open_or_get_active(ctx, table_id, token)?;
        self.orders
            .find_by_id(ctx, order_id)?
            .filter(|o| owned_by(o, table_id, &session) && o.status != OrderStatus::Draft)
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))
    }
}

fn owned_by(order: &Order, table_id: i64, session: &TableSession) -> bool {
    order.table_id == table_id
        && order.session_id == session.id
        && order.session_key == session.session_key
}
