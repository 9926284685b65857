//! Common types for the shared crate
//!
//! Caller identity and tenant scope, threaded through every operation.

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Tenant scope for a single operation.
///
/// Every persisted document carries a `restaurant_id`; lookups are always
/// filtered by the context's id so a foreign id behaves like an unknown one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub restaurant_id: String,
}

impl TenantContext {
    pub fn new(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
        }
    }

    /// Whether a document's tenant discriminator belongs to this context
    pub fn owns(&self, restaurant_id: &str) -> bool {
        self.restaurant_id == restaurant_id
    }
}

/// Kind of authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectType {
    /// Registered customer
    User,
    /// Staff account (waiter, kitchen, admin)
    Account,
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectType::User => write!(f, "USER"),
            SubjectType::Account => write!(f, "ACCOUNT"),
        }
    }
}

/// Authenticated caller as yielded by the upstream credential verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub subject_type: SubjectType,
    pub subject_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Actor {
    pub fn user(subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::User,
            subject_id: subject_id.into(),
            role: None,
        }
    }

    pub fn account(subject_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::Account,
            subject_id: subject_id.into(),
            role: Some(role.into()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.subject_type == SubjectType::User
    }
}
