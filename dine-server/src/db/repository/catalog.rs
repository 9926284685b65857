//! Catalog Repository
//!
//! Menu items, modifier groups and options. Read by the cart pricing and
//! ticket enrichment paths; written here only for counters and ratings.

use crate::db::{Storage, StorageResult};
use shared::TenantContext;
use shared::models::{
    MenuItem, MenuItemCreate, MenuItemStatus, ModifierGroup, ModifierOption, ModifierStatus,
    RatingBreakdown,
};
use shared::util::now_millis;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct CatalogRepository {
    storage: Storage,
}

impl CatalogRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ========== Items ==========

    pub fn create_item(&self, ctx: &TenantContext, data: MenuItemCreate) -> StorageResult<MenuItem> {
        self.storage.insert(MenuItem {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            name: data.name,
            price_cents: data.price_cents,
            prep_time_minutes: data.prep_time_minutes,
            status: MenuItemStatus::Available,
            is_deleted: false,
            popularity_count: 0,
            modifier_group_ids: data.modifier_group_ids,
            rating_avg: 0.0,
            rating_count: 0,
            rating_breakdown: RatingBreakdown::default(),
            created_at: now_millis(),
        })
    }

    pub fn find_item(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<MenuItem>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    pub fn set_item_status(
        &self,
        ctx: &TenantContext,
        id: i64,
        status: MenuItemStatus,
    ) -> StorageResult<Option<MenuItem>> {
        self.storage
            .update(&ctx.restaurant_id, id, |i: &mut MenuItem| i.status = status)
    }

    /// Bump an item's popularity counter
    pub fn add_popularity(&self, ctx: &TenantContext, id: i64, by: u64) -> StorageResult<bool> {
        Ok(self
            .storage
            .update(&ctx.restaurant_id, id, |i: &mut MenuItem| {
                i.popularity_count = i.popularity_count.saturating_add(by)
            })?
            .is_some())
    }

    /// Overwrite the denormalised rating fields
    pub fn set_rating(
        &self,
        ctx: &TenantContext,
        id: i64,
        avg: f64,
        count: u32,
        breakdown: RatingBreakdown,
    ) -> StorageResult<Option<MenuItem>> {
        self.storage.update(&ctx.restaurant_id, id, |i: &mut MenuItem| {
            i.rating_avg = avg;
            i.rating_count = count;
            i.rating_breakdown = breakdown;
        })
    }

    /// Items keyed by id, for read-time joins
    pub fn items_by_ids(
        &self,
        ctx: &TenantContext,
        ids: &[i64],
    ) -> StorageResult<HashMap<i64, MenuItem>> {
        Ok(self
            .storage
            .scan(&ctx.restaurant_id, |i: &MenuItem| ids.contains(&i.id))?
            .into_iter()
            .map(|i| (i.id, i))
            .collect())
    }

    // ========== Modifiers ==========

    pub fn create_group(&self, ctx: &TenantContext, name: &str) -> StorageResult<ModifierGroup> {
        self.storage.insert(ModifierGroup {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            name: name.to_string(),
            status: ModifierStatus::Active,
        })
    }

    pub fn create_option(
        &self,
        ctx: &TenantContext,
        group_id: i64,
        name: &str,
        price_adjustment_cents: i64,
    ) -> StorageResult<ModifierOption> {
        self.storage.insert(ModifierOption {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            group_id,
            name: name.to_string(),
            price_adjustment_cents,
            status: ModifierStatus::Active,
        })
    }

    pub fn set_option_status(
        &self,
        ctx: &TenantContext,
        id: i64,
        status: ModifierStatus,
    ) -> StorageResult<Option<ModifierOption>> {
        self.storage
            .update(&ctx.restaurant_id, id, |o: &mut ModifierOption| o.status = status)
    }

    pub fn groups_by_ids(
        &self,
        ctx: &TenantContext,
        ids: &[i64],
    ) -> StorageResult<HashMap<i64, ModifierGroup>> {
        Ok(self
            .storage
            .scan(&ctx.restaurant_id, |g: &ModifierGroup| ids.contains(&g.id))?
            .into_iter()
            .map(|g| (g.id, g))
            .collect())
    }

    pub fn options_by_ids(
        &self,
        ctx: &TenantContext,
        ids: &[i64],
    ) -> StorageResult<HashMap<i64, ModifierOption>> {
        Ok(self
            .storage
            .scan(&ctx.restaurant_id, |o: &ModifierOption| ids.contains(&o.id))?
            .into_iter()
            .map(|o| (o.id, o))
            .collect())
    }
}
