//! Bill Repository

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::{Bill, BillStatus};

#[derive(Clone, Debug)]
pub struct BillRepository {
    storage: Storage,
}

impl BillRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a bill as the session's single open one
    ///
    /// Returns `None` when the session's open-bill slot is already taken.
    pub fn create_open(&self, bill: Bill) -> StorageResult<Option<Bill>> {
        let key = open_key(bill.session_id);
        self.storage.insert_unique(bill, &key)
    }

    /// Free the session's open-bill slot once its bill left REQUESTED/PAYMENT_PENDING
    pub fn release_open(&self, ctx: &TenantContext, session_id: i64) -> StorageResult<()> {
        self.storage
            .release_unique::<Bill>(&ctx.restaurant_id, &open_key(session_id))
    }

    pub fn find_by_id(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<Bill>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    /// Newest REQUESTED / PAYMENT_PENDING bill of a session
    pub fn find_open_for_session(
        &self,
        ctx: &TenantContext,
        session_id: i64,
    ) -> StorageResult<Option<Bill>> {
        self.storage.find_latest(&ctx.restaurant_id, |b: &Bill| {
            b.session_id == session_id && b.status.is_open()
        })
    }

    /// Newest bill of a table session in one of `statuses`
    pub fn find_latest_for_session(
        &self,
        ctx: &TenantContext,
        session_id: i64,
        statuses: &[BillStatus],
    ) -> StorageResult<Option<Bill>> {
        self.storage.find_latest(&ctx.restaurant_id, |b: &Bill| {
            b.session_id == session_id && statuses.contains(&b.status)
        })
    }

    /// Bills matching `filter`, newest first
    pub fn list<P>(&self, ctx: &TenantContext, filter: P) -> StorageResult<Vec<Bill>>
    where
        P: Fn(&Bill) -> bool,
    {
        let mut bills = self.storage.scan(&ctx.restaurant_id, filter)?;
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bills)
    }

    pub fn update_if<G, F>(
        &self,
        ctx: &TenantContext,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<Bill>>
    where
        G: FnOnce(&Bill) -> bool,
        F: FnOnce(&mut Bill),
    {
        self.storage.update_if(&ctx.restaurant_id, id, guard, apply)
    }
}

fn open_key(session_id: i64) -> String {
    format!("open:{}", session_id)
}
