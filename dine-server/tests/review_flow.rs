//! 菜品评价
//!
//! Review lifecycle and the item rating aggregate.

mod common;

use common::Fixture;
use shared::models::{ReviewCreate, ReviewStatus, ReviewUpdate};
use shared::{Actor, ErrorCode, ErrorKind};

fn stars(rating: u8, comment: &str) -> ReviewCreate {
    ReviewCreate {
        rating,
        comment: Some(comment.into()),
    }
}

#[test]
fn test_reviews_update_item_rating() {
    let fx = Fixture::new();
    let reviews = &fx.state.reviews;
    for (user, rating) in [("u1", 5), ("u2", 4), ("u3", 4)] {
        reviews
            .create(&fx.ctx, fx.pho.id, stars(rating, "  good  "), &Actor::user(user))
            .unwrap();
    }

    let pho = fx.state.catalog.find_item(&fx.ctx, fx.pho.id).unwrap().unwrap();
    assert_eq!(pho.rating_count, 3);
    assert_eq!(pho.rating_avg, 4.33);
    assert_eq!(pho.rating_breakdown.four, 2);
    assert_eq!(pho.rating_breakdown.five, 1);

    let page = reviews.list_for_item(&fx.ctx, fx.pho.id, None, None).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.limit, 10);
    assert_eq!(page.reviews[0].comment, "good");
}

#[test]
fn test_one_review_per_user_and_item() {
    let fx = Fixture::new();
    let alice = Actor::user("alice");
    fx.state
        .reviews
        .create(&fx.ctx, fx.tea.id, stars(3, "ok"), &alice)
        .unwrap();

    let err = fx
        .state
        .reviews
        .create(&fx.ctx, fx.tea.id, stars(5, "again"), &alice)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ReviewDuplicate);
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // another item is fine
    fx.state
        .reviews
        .create(&fx.ctx, fx.pho.id, stars(5, "great"), &alice)
        .unwrap();
    assert_eq!(fx.state.reviews.list_mine(&fx.ctx, &alice).unwrap().len(), 2);
}

#[test]
fn test_create_rejects_bad_input() {
    let fx = Fixture::new();
    let alice = Actor::user("alice");

    let err = fx
        .state
        .reviews
        .create(&fx.ctx, fx.tea.id, stars(6, "too many"), &alice)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RatingOutOfRange);

    let err = fx
        .state
        .reviews
        .create(&fx.ctx, 9999, stars(4, "where"), &alice)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MenuItemNotFound);

    let staff = Actor::account("staff-1", "waiter");
    let err = fx
        .state
        .reviews
        .create(&fx.ctx, fx.tea.id, stars(4, "hm"), &staff)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn test_only_owner_edits() {
    let fx = Fixture::new();
    let alice = Actor::user("alice");
    let created = fx
        .state
        .reviews
        .create(&fx.ctx, fx.tea.id, stars(2, "cold"), &alice)
        .unwrap();
    let id = created.review.review_id;

    let patch = ReviewUpdate {
        rating: Some(5),
        ..Default::default()
    };
    let err = fx
        .state
        .reviews
        .update(&fx.ctx, id, patch.clone(), &Actor::user("mallory"))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotResourceOwner);

    let err = fx
        .state
        .reviews
        .update(&fx.ctx, id, ReviewUpdate::default(), &alice)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoChanges);

    let updated = fx.state.reviews.update(&fx.ctx, id, patch, &alice).unwrap();
    assert_eq!(updated.review.rating, 5);
    assert_eq!(updated.review.comment, "cold");
    let tea = fx.state.catalog.find_item(&fx.ctx, fx.tea.id).unwrap().unwrap();
    assert_eq!(tea.rating_avg, 5.0);

    // hidden reviews drop out of the aggregate
    let hide = ReviewUpdate {
        status: Some(ReviewStatus::Hidden),
        ..Default::default()
    };
    fx.state.reviews.update(&fx.ctx, id, hide, &alice).unwrap();
    let tea = fx.state.catalog.find_item(&fx.ctx, fx.tea.id).unwrap().unwrap();
    assert_eq!(tea.rating_count, 0);
    assert_eq!(tea.rating_avg, 0.0);
    assert_eq!(fx.state.reviews.list_for_item(&fx.ctx, fx.tea.id, None, None).unwrap().total, 0);
}

#[test]
fn test_remove_allows_a_fresh_review() {
    let fx = Fixture::new();
    let alice = Actor::user("alice");
    let first = fx
        .state
        .reviews
        .create(&fx.ctx, fx.pho.id, stars(1, "salty"), &alice)
        .unwrap();
    let id = first.review.review_id;

    let err = fx
        .state
        .reviews
        .remove(&fx.ctx, id, &Actor::user("bob"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    fx.state.reviews.remove(&fx.ctx, id, &alice).unwrap();
    // 重复删除仍然成功
    fx.state.reviews.remove(&fx.ctx, id, &alice).unwrap();

    let pho = fx.state.catalog.find_item(&fx.ctx, fx.pho.id).unwrap().unwrap();
    assert_eq!(pho.rating_count, 0);
    assert!(fx.state.reviews.list_mine(&fx.ctx, &alice).unwrap().is_empty());

    let err = fx
        .state
        .reviews
        .update(&fx.ctx, id, ReviewUpdate { rating: Some(3), ..Default::default() }, &alice)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ReviewNotFound);

    let second = fx
        .state
        .reviews
        .create(&fx.ctx, fx.pho.id, stars(4, "better"), &alice)
        .unwrap();
    assert_ne!(second.review.review_id, id);
    let pho = fx.state.catalog.find_item(&fx.ctx, fx.pho.id).unwrap().unwrap();
    assert_eq!(pho.rating_count, 1);
    assert_eq!(pho.rating_avg, 4.0);
}

#[test]
fn test_list_for_item_pages_and_clamps() {
    let fx = Fixture::new();
    for i in 0..12 {
        fx.state
            .reviews
            .create(&fx.ctx, fx.tea.id, stars(3, "fine"), &Actor::user(format!("u{}", i)))
            .unwrap();
    }

    let second = fx
        .state
        .reviews
        .list_for_item(&fx.ctx, fx.tea.id, Some(2), None)
        .unwrap();
    assert_eq!(second.total, 12);
    assert_eq!(second.reviews.len(), 2);

    let big = fx
        .state
        .reviews
        .list_for_item(&fx.ctx, fx.tea.id, Some(0), Some(500))
        .unwrap();
    assert_eq!(big.page, 1);
    assert_eq!(big.limit, 50);
    assert_eq!(big.reviews.len(), 12);
}
