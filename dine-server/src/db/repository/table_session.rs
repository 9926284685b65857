//! Table Session Repository

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::TableSession;

#[derive(Clone, Debug)]
pub struct TableSessionRepository {
    storage: Storage,
}

impl TableSessionRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a session as the table's single active one
    ///
    /// Returns `None` when another active session already holds the table.
    pub fn open(&self, session: TableSession) -> StorageResult<Option<TableSession>> {
        let key = active_key(session.table_id);
        self.storage.insert_unique(session, &key)
    }

    /// Free the table's active slot after the session closed
    pub fn release(&self, ctx: &TenantContext, table_id: i64) -> StorageResult<()> {
        self.storage
            .release_unique::<TableSession>(&ctx.restaurant_id, &active_key(table_id))
    }

    pub fn find_by_id(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<TableSession>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    /// Newest non-closed session of a table
    pub fn find_active_for_table(
        &self,
        ctx: &TenantContext,
        table_id: i64,
    ) -> StorageResult<Option<TableSession>> {
        self.storage.find_latest(&ctx.restaurant_id, |s: &TableSession| {
            s.table_id == table_id && s.status.is_active()
        })
    }

    pub fn update_if<G, F>(
        &self,
        ctx: &TenantContext,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<TableSession>>
    where
        G: FnOnce(&TableSession) -> bool,
        F: FnOnce(&mut TableSession),
    {
        self.storage.update_if(&ctx.restaurant_id, id, guard, apply)
    }

    pub fn update<F>(&self, ctx: &TenantContext, id: i64, apply: F) -> StorageResult<Option<TableSession>>
    where
        F: FnOnce(&mut TableSession),
    {
        self.storage.update(&ctx.restaurant_id, id, apply)
    }
}

fn active_key(table_id: i64) -> String {
    format!("active:{}", table_id)
}
