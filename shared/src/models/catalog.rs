//! Menu catalog models
//!
//! Only the fields the ordering flow reads: prices, availability, prep time
//! and display names. Catalog administration lives outside this engine.

use serde::{Deserialize, Serialize};

/// Menu item availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItemStatus {
    #[default]
    Available,
    Unavailable,
    SoldOut,
}

/// Per-star review histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingBreakdown {
    #[serde(rename = "1")]
    pub one: u32,
    #[serde(rename = "2")]
    pub two: u32,
    #[serde(rename = "3")]
    pub three: u32,
    #[serde(rename = "4")]
    pub four: u32,
    #[serde(rename = "5")]
    pub five: u32,
}

impl RatingBreakdown {
    /// Count one more review with `stars`; values outside 1..=5 are ignored
    pub fn record(&mut self, stars: u8) {
        match stars {
            1 => self.one += 1,
            2 => self.two += 1,
            3 => self.three += 1,
            4 => self.four += 1,
            5 => self.five += 1,
            _ => {}
        }
    }

    pub fn get(&self, stars: u8) -> u32 {
        match stars {
            1 => self.one,
            2 => self.two,
            3 => self.three,
            4 => self.four,
            5 => self.five,
            _ => 0,
        }
    }
}

/// Menu item (菜品)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub restaurant_id: String,
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub prep_time_minutes: u32,
    pub status: MenuItemStatus,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub popularity_count: u64,
    #[serde(default)]
    pub modifier_group_ids: Vec<i64>,
    #[serde(default)]
    pub rating_avg: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub rating_breakdown: RatingBreakdown,
    pub created_at: i64,
}

impl MenuItem {
    /// Whether a customer may put this item in a cart
    pub fn is_orderable(&self) -> bool {
        !self.is_deleted && self.status == MenuItemStatus::Available
    }
}

/// Create menu item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub name: String,
    pub price_cents: i64,
    pub prep_time_minutes: u32,
    #[serde(default)]
    pub modifier_group_ids: Vec<i64>,
}

/// Modifier group / option availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierStatus {
    #[default]
    Active,
    Inactive,
}

/// Modifier group, e.g. "Size" or "Toppings"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroup {
    pub id: i64,
    pub restaurant_id: String,
    pub name: String,
    pub status: ModifierStatus,
}

/// One selectable option within a modifier group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierOption {
    pub id: i64,
    pub restaurant_id: String,
    pub group_id: i64,
    pub name: String,
    pub price_adjustment_cents: i64,
    pub status: ModifierStatus,
}
