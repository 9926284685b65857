//! Item Review Model

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Published,
    Hidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReview {
    pub id: i64,
    pub restaurant_id: String,
    pub item_id: i64,
    pub user_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub status: ReviewStatus,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ItemReview {
    /// Counted by the rating aggregator
    pub fn is_visible(&self) -> bool {
        !self.is_deleted && self.status == ReviewStatus::Published
    }
}

/// Create review payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewCreate {
    pub rating: u8,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Update review payload; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    pub status: Option<ReviewStatus>,
}

impl ReviewUpdate {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none() && self.status.is_none()
    }
}
