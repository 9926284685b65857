//! 评分聚合
//!
//! Ratings are recomputed from scratch over visible reviews on every write
//! rather than adjusted incrementally.

use shared::models::{ItemReview, RatingBreakdown};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    /// Mean rating rounded to 2 decimals, 0 when unrated
    pub avg: f64,
    pub count: u32,
    pub breakdown: RatingBreakdown,
}

/// Summarise published, non-deleted reviews
pub fn summarize<'a, I>(reviews: I) -> RatingSummary
where
    I: IntoIterator<Item = &'a ItemReview>,
{
    let mut summary = RatingSummary::default();
    let mut sum: u64 = 0;
    for r in reviews.into_iter().filter(|r| r.is_visible()) {
        summary.count += 1;
        sum += u64::from(r.rating);
        summary.breakdown.record(r.rating);
    }
    if summary.count > 0 {
        let mean = sum as f64 / f64::from(summary.count);
        summary.avg = (mean * 100.0).round() / 100.0;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ReviewStatus;

    fn review(rating: u8, status: ReviewStatus, deleted: bool) -> ItemReview {
        ItemReview {
            id: 1,
            restaurant_id: "r1".into(),
            item_id: 1,
            user_id: "u1".into(),
            rating,
            comment: String::new(),
            status,
            is_deleted: deleted,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let s = summarize(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.avg, 0.0);
    }

    #[test]
    fn test_average_rounded_to_two_decimals() {
        let reviews = vec![
            review(5, ReviewStatus::Published, false),
            review(4, ReviewStatus::Published, false),
            review(4, ReviewStatus::Published, false),
        ];
        let s = summarize(&reviews);
        assert_eq!(s.count, 3);
        assert_eq!(s.avg, 4.33);
        assert_eq!(s.breakdown.get(4), 2);
        assert_eq!(s.breakdown.get(5), 1);
    }

    #[test]
    fn test_hidden_and_deleted_are_ignored() {
        let reviews = vec![
            review(1, ReviewStatus::Hidden, false),
            review(2, ReviewStatus::Published, true),
            review(5, ReviewStatus::Published, false),
        ];
        let s = summarize(&reviews);
        assert_eq!(s.count, 1);
        assert_eq!(s.avg, 5.0);
        assert_eq!(s.breakdown.get(1), 0);
    }
}
