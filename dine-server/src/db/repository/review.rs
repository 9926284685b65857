//! Item Review Repository

use crate::db::{Guarded, Storage, StorageResult};
use shared::TenantContext;
use shared::models::ItemReview;

/// Unique key: one live review per (item, user)
fn review_key(item_id: i64, user_id: &str) -> String {
    format!("{}:{}", item_id, user_id)
}

#[derive(Clone, Debug)]
pub struct ReviewRepository {
    storage: Storage,
}

impl ReviewRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a review; `None` if the user already has a live review of the item
    pub fn create(&self, review: ItemReview) -> StorageResult<Option<ItemReview>> {
        let key = review_key(review.item_id, &review.user_id);
        self.storage.insert_unique(review, &key)
    }

    /// Free the (item, user) slot after a soft delete
    pub fn release(&self, ctx: &TenantContext, item_id: i64, user_id: &str) -> StorageResult<()> {
        self.storage
            .release_unique::<ItemReview>(&ctx.restaurant_id, &review_key(item_id, user_id))
    }

    pub fn find_by_id(&self, ctx: &TenantContext, id: i64) -> StorageResult<Option<ItemReview>> {
        self.storage.get(&ctx.restaurant_id, id)
    }

    /// Every review of an item, deleted or not
    pub fn list_for_item(&self, ctx: &TenantContext, item_id: i64) -> StorageResult<Vec<ItemReview>> {
        self.storage
            .scan(&ctx.restaurant_id, |r: &ItemReview| r.item_id == item_id)
    }

    pub fn list_by_user(&self, ctx: &TenantContext, user_id: &str) -> StorageResult<Vec<ItemReview>> {
        self.storage.scan(&ctx.restaurant_id, |r: &ItemReview| {
            r.user_id == user_id && !r.is_deleted
        })
    }

    pub fn update_if<G, F>(
        &self,
        ctx: &TenantContext,
        id: i64,
        guard: G,
        apply: F,
    ) -> StorageResult<Guarded<ItemReview>>
    where
        G: FnOnce(&ItemReview) -> bool,
        F: FnOnce(&mut ItemReview),
    {
        self.storage.update_if(&ctx.restaurant_id, id, guard, apply)
    }
}
