//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Occupancy state of a physical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    /// Free and accepting guests
    #[default]
    Active,
    /// Disabled by staff, QR codes are refused
    Inactive,
    /// A session is running
    Occupied,
}

impl TableStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Active => "active",
            TableStatus::Inactive => "inactive",
            TableStatus::Occupied => "occupied",
        }
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dining table entity (桌台)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub restaurant_id: String,
    pub table_number: String,
    pub capacity: i32,
    #[serde(default)]
    pub location: Option<String>,
    pub status: TableStatus,
    /// Bumped on QR rotation; tokens carrying an older version are refused
    pub qr_token_version: u32,
    pub created_at: i64,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub table_number: String,
    pub capacity: i32,
    pub location: Option<String>,
}
