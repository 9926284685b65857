//! Dining Table Repository

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::{DiningTable, DiningTableCreate, TableStatus};
use shared::util::now_millis;

#[derive(Clone, Debug)]
pub struct DiningTableRepository {
    storage: Storage,
}

impl DiningTableRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, ctx: &TenantContext, data: DiningTableCreate) -> StorageResult<DiningTable> {
        self.storage.insert(DiningTable {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            table_number: data.table_number,
            capacity: data.capacity,
            location: data.location,
            status: TableStatus::Active,
            qr_token_version: 1,
            created_at: now_millis(),
        })
    }

    pub fn find_by_id(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<DiningTable>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    /// Set `status` unless the table already has it or is in `unless`
    ///
    /// `Applied` means the stored status actually changed, which is the
    /// trigger for a single `table.status_changed` event.
    pub fn transition(
        &self,
        ctx: &TenantContext,
        id: i64,
        status: TableStatus,
        unless: &[TableStatus],
    ) -> StorageResult<Guarded<DiningTable>> {
        self.storage.update_if(
            &ctx.restaurant_id,
            id,
            |t: &DiningTable| t.status != status && !unless.contains(&t.status),
            |t| t.status = status,
        )
    }

    /// Staff toggle for enabling/disabling a table
    pub fn set_status(
        &self,
        ctx: &TenantContext,
        id: i64,
        status: TableStatus,
    ) -> StorageResult<Option<DiningTable>> {
        self.storage
            .update(&ctx.restaurant_id, id, |t: &mut DiningTable| t.status = status)
    }

    /// Bump the QR token version, invalidating every printed code
    pub fn rotate_qr(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<DiningTable>> {
        self.storage.update(&ctx.restaurant_id, id, |t: &mut DiningTable| {
            t.qr_token_version += 1
        })
    }
}
