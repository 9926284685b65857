//! Payment Repository
//!
//! Payments are addressed by their gateway transaction reference, kept in
//! the storage's unique key index.

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::Payment;

#[derive(Clone, Debug)]
pub struct PaymentRepository {
    storage: Storage,
}

impl PaymentRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a payment claiming its `txn_ref`; `None` if the reference is taken
    pub fn create(&self, payment: Payment) -> StorageResult<Option<Payment>> {
        let txn_ref = payment.txn_ref.clone();
        self.storage.insert_unique(payment, &txn_ref)
    }

    pub fn find_by_txn_ref(&self, ctx: &TenantContext, txn_ref: &str) -> StorageResult<Option<Payment>> {
        self.storage.get_by_unique(&ctx.restaurant_id, txn_ref)
    }

    pub fn update_if<G, F>(
        &self,
        ctx: &TenantContext,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<Payment>>
    where
        G: FnOnce(&Payment) -> bool,
        F: FnOnce(&mut Payment),
    {
        self.storage.update_if(&ctx.restaurant_id, id, guard, apply)
    }
}
