//! Order Repository

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::{Order, OrderStatus};

#[derive(Clone, Debug)]
pub struct OrderRepository {
    storage: Storage,
}

impl OrderRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, order: Order) -> StorageResult<Order> {
        self.storage.insert(order)
    }

    pub fn find_by_id(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<Order>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    /// The session's current draft, scoped by table and session key
    pub fn find_draft(
        &self,
        ctx: &TenantContext,
        table_id: i64,
        session_id: i64,
        session_key: &str,
    ) -> StorageResult<Option<Order>> {
        self.storage.find_latest(&ctx.restaurant_id, |o: &Order| {
            o.status == OrderStatus::Draft
                && o.table_id == table_id
                && o.session_id == session_id
                && o.session_key == session_key
        })
    }

    /// All orders of a session, oldest first
    pub fn list_by_session(&self, ctx: &TenantContext, session_id: i64) -> StorageResult<Vec<Order>> {
        self.storage
            .scan(&ctx.restaurant_id, |o: &Order| o.session_id == session_id)
    }

    /// Orders by id, in the given order; unknown ids are skipped
    pub fn find_many(&self, ctx: &TenantContext, ids: &[i64]) -> StorageResult<Vec<Order>> {
        let mut orders = self
            .storage
            .scan(&ctx.restaurant_id, |o: &Order| ids.contains(&o.id))?;
        orders.sort_by_key(|o| ids.iter().position(|id| *id == o.id));
        Ok(orders)
    }

    /// Submitted orders, newest first, optionally filtered by status
    pub fn list_submitted(
        &self,
        ctx: &TenantContext,
        status: Option<OrderStatus>,
    ) -> StorageResult<Vec<Order>> {
        let mut orders = self.storage.scan(&ctx.restaurant_id, |o: &Order| {
            o.status != OrderStatus::Draft && status.is_none_or(|s| o.status == s)
        })?;
        orders.reverse();
        Ok(orders)
    }

    pub fn update_if<G, F>(
        &self,
        ctx: &TenantContext,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<Order>>
    where
        G: FnOnce(&Order) -> bool,
        F: FnOnce(&mut Order),
    {
        self.storage.update_if(&ctx.restaurant_id, id, guard, apply)
    }

    /// Tie still-unbilled orders of a session to a bill
    ///
    /// One guarded update per order ("only where bill_id is unset"), so an
    /// order already claimed by another bill is left alone. Returns the ids
    /// that were stamped.
    pub fn mark_billed(
        &self,
        ctx: &TenantContext,
        session_id: i64,
        order_ids: &[i64],
        bill_id: i64,
        at: i64,
    ) -> StorageResult<Vec<i64>> {
        let mut stamped = Vec::new();
        for &order_id in order_ids {
            let outcome = self.storage.update_if(
                &ctx.restaurant_id,
                order_id,
                |o: &Order| o.session_id == session_id && o.bill_id.is_none(),
                |o| {
                    o.bill_id = Some(bill_id);
                    o.billed_at = Some(at);
                    o.updated_at = at;
                },
            )?;
            if outcome.is_applied() {
                stamped.push(order_id);
            }
        }
        Ok(stamped)
    }
}
