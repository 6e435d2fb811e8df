//! Database models
//!
//! Field names serialize as camelCase to match the front-end contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role granted to owner accounts
pub const ROLE_ADMIN: &str = "admin";

/// Default role
pub const ROLE_USER: &str = "user";

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: String,
    /// Set once payment completes; gates every board operation
    pub is_active: bool,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

/// Identity fields asserted by the auth proxy, used for upserts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
}

/// Per-user board progress
///
/// `current_house_id` and `xp_points` never decrease. `completed_at` is set
/// exactly when `current_house_id` moves past the last house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: i64,
    pub user_id: i64,
    pub current_house_id: i64,
    pub xp_points: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One answer attempt and the mentor's reply (append-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub house_id: i64,
    pub user_message: String,
    pub mentor_response: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Chat entry before insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatEntry {
    pub user_id: i64,
    pub house_id: i64,
    pub user_message: String,
    pub mentor_response: String,
    pub approved: bool,
}
