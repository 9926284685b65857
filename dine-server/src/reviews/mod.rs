//! 评价模块

pub mod rating;
pub mod service;

pub use rating::{RatingSummary, summarize};
pub use service::{RemoveReviewResult, ReviewPage, ReviewResult, ReviewService, ReviewView};
