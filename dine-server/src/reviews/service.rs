//! 菜品评价
//!
//! One live review per (item, user). Writes are limited to `USER` actors
//! and every write re-runs the rating aggregator for the item.

use super::rating::summarize;
use crate::db::Guarded;
use crate::db::repository::{CatalogRepository, ReviewRepository};
use crate::utils::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use shared::models::{ItemReview, ReviewCreate, ReviewStatus, ReviewUpdate};
use shared::util::now_millis;
use shared::{Actor, TenantContext};
use tracing::info;
use validator::Validate;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
    pub review_id: i64,
    pub item_id: i64,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ItemReview> for ReviewView {
    fn from(r: ItemReview) -> Self {
        Self {
            review_id: r.id,
            item_id: r.item_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub ok: bool,
    pub review: ReviewView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    pub ok: bool,
    pub total: usize,
    pub page: i64,
    pub limit: i64,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveReviewResult {
    pub ok: bool,
    pub review_id: i64,
}

fn must_be_user(actor: &Actor) -> AppResult<()> {
    if actor.is_user() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only USER can write reviews"))
    }
}

fn check_rating(rating: u8) -> AppResult<u8> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(AppError::with_message(ErrorCode::RatingOutOfRange, "Invalid rating (1..5)"))
    }
}

fn normalize_comment(comment: Option<&str>) -> String {
    comment.unwrap_or_default().trim().to_string()
}

#[derive(Debug, Clone)]
pub struct ReviewService {
    reviews: ReviewRepository,
    catalog: CatalogRepository,
}

impl ReviewService {
    pub fn new(reviews: ReviewRepository, catalog: CatalogRepository) -> Self {
        Self { reviews, catalog }
    }

    pub fn create(
        &self,
        ctx: &TenantContext,
        item_id: i64,
        data: ReviewCreate,
        actor: &Actor,
    ) -> AppResult<ReviewResult> {
        must_be_user(actor)?;
        data.validate()?;
        let rating = check_rating(data.rating)?;
        if self
            .catalog
            .find_item(ctx, item_id)?
            .is_none_or(|i| i.is_deleted)
        {
            return Err(AppError::new(ErrorCode::MenuItemNotFound));
        }

        let now = now_millis();
        let review = ItemReview {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            item_id,
            user_id: actor.subject_id.clone(),
            rating,
            comment: normalize_comment(data.comment.as_deref()),
            status: ReviewStatus::Published,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let review = self
            .reviews
            .create(review)?
            .ok_or_else(|| AppError::new(ErrorCode::ReviewDuplicate))?;

        info!(review_id = review.id, item_id, rating, "review created");
        self.sync_item_rating(ctx, item_id)?;

        Ok(ReviewResult {
            ok: true,
            review: review.into(),
        })
    }

    pub fn update(
        &self,
        ctx: &TenantContext,
        review_id: i64,
        patch: ReviewUpdate,
        actor: &Actor,
    ) -> AppResult<ReviewResult> {
        must_be_user(actor)?;
        patch.validate()?;

        let existing = self
            .reviews
            .find_by_id(ctx, review_id)?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
        if existing.user_id != actor.subject_id {
            return Err(AppError::with_message(
                ErrorCode::NotResourceOwner,
                "You can only edit your own review",
            ));
        }
        if patch.is_empty() {
            return Err(AppError::new(ErrorCode::NoChanges));
        }
        let rating = patch.rating.map(check_rating).transpose()?;
        let comment = patch.comment.as_deref().map(|c| normalize_comment(Some(c)));

        let now = now_millis();
        let review = match self.reviews.update_if(
            ctx,
            review_id,
            |r| !r.is_deleted && r.user_id == actor.subject_id,
            |r| {
                if let Some(rating) = rating {
                    r.rating = rating;
                }
                if let Some(comment) = comment {
                    r.comment = comment;
                }
                if let Some(status) = patch.status {
                    r.status = status;
                }
                r.updated_at = now;
            },
        )? {
            Guarded::Applied(r) => r,
            Guarded::Rejected(_) | Guarded::Missing => {
                return Err(AppError::new(ErrorCode::ReviewNotFound));
            }
        };

        info!(review_id, "review updated");
        // status changes affect visibility, so always re-aggregate
        self.sync_item_rating(ctx, review.item_id)?;

        Ok(ReviewResult {
            ok: true,
            review: review.into(),
        })
    }

    /// Soft delete; removing a missing or deleted review succeeds
    pub fn remove(
        &self,
        ctx: &TenantContext,
        review_id: i64,
        actor: &Actor,
    ) -> AppResult<RemoveReviewResult> {
        must_be_user(actor)?;
        let done = RemoveReviewResult {
            ok: true,
            review_id,
        };

        let Some(existing) = self.reviews.find_by_id(ctx, review_id)?.filter(|r| !r.is_deleted) else {
            return Ok(done);
        };
        if existing.user_id != actor.subject_id {
            return Err(AppError::with_message(
                ErrorCode::NotResourceOwner,
                "You can only delete your own review",
            ));
        }

        let now = now_millis();
        let outcome = self.reviews.update_if(
            ctx,
            review_id,
            |r| !r.is_deleted,
            |r| {
                r.is_deleted = true;
                r.status = ReviewStatus::Hidden;
                r.updated_at = now;
            },
        )?;
        if let Guarded::Applied(r) = outcome {
            self.reviews.release(ctx, r.item_id, &r.user_id)?;
            info!(review_id, item_id = r.item_id, "review deleted");
            self.sync_item_rating(ctx, r.item_id)?;
        }
        Ok(done)
    }

    /// Published reviews of an item, newest first
    pub fn list_for_item(
        &self,
        ctx: &TenantContext,
        item_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<ReviewPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let mut reviews: Vec<ItemReview> = self
            .reviews
            .list_for_item(ctx, item_id)?
            .into_iter()
            .filter(ItemReview::is_visible)
            .collect();
        newest_first(&mut reviews);

        let total = reviews.len();
        let reviews = reviews
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .map(ReviewView::from)
            .collect();

        Ok(ReviewPage {
            ok: true,
            total,
            page,
            limit,
            reviews,
        })
    }

    /// The caller's live reviews, newest first
    pub fn list_mine(&self, ctx: &TenantContext, actor: &Actor) -> AppResult<Vec<ReviewView>> {
        must_be_user(actor)?;
        let mut reviews = self.reviews.list_by_user(ctx, &actor.subject_id)?;
        newest_first(&mut reviews);
        Ok(reviews.into_iter().map(ReviewView::from).collect())
    }

    fn sync_item_rating(&self, ctx: &TenantContext, item_id: i64) -> AppResult<()> {
        let reviews = self.reviews.list_for_item(ctx, item_id)?;
        let summary = summarize(&reviews);
        self.catalog
            .set_rating(ctx, item_id, summary.avg, summary.count, summary.breakdown)?;
        tracing::debug!(item_id, avg = summary.avg, count = summary.count, "item rating synced");
        Ok(())
    }
}

fn newest_first(reviews: &mut [ItemReview]) {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorKind;

    #[test]
    fn test_only_users_write() {
        assert!(must_be_user(&Actor::user("u1")).is_ok());
        let err = must_be_user(&Actor::account("a1", "waiter")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(check_rating(5).unwrap(), 5);
        let err = check_rating(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(check_rating(6).is_err());
    }

    #[test]
    fn test_comment_is_trimmed() {
        assert_eq!(normalize_comment(Some("  tasty  ")), "tasty");
        assert_eq!(normalize_comment(None), "");
    }
}
