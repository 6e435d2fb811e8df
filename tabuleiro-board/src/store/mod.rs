//! Durable state consumed by the progression controller and access gate
//!
//! [`ProgressStore`] owns progress pointers and the chat log;
//! [`AccountStore`] owns user records and the paid-access flag. Both are
//! object-safe so the controller can run against SQLite, a test double, or
//! [`UnavailableStore`] when no database is configured.

pub mod sqlite;

use async_trait::async_trait;
use tabuleiro_common::db::{ChatHistoryEntry, NewChatEntry, User, UserProfile, UserProgress};
use thiserror::Error;

pub use sqlite::SqliteStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backing store configured
    #[error("Store unavailable")]
    Unavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Progress not found for user {0}")]
    ProgressNotFound(i64),

    /// Conditional advance found the pointer somewhere else
    #[error("Progress for user {user_id} is at house {current}, expected {expected}")]
    Conflict {
        user_id: i64,
        expected: i64,
        current: i64,
    },

    #[error("Invalid advance: {0}")]
    InvalidAdvance(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of persisting one answer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub entry: ChatHistoryEntry,
    /// Updated progress when the attempt advanced the learner
    pub progress: Option<UserProgress>,
}

/// Progress pointers and chat history
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(&self, user_id: i64) -> StoreResult<Option<UserProgress>>;

    /// Create the default record (house 1, 0 XP); returns the existing one if present
    async fn create_progress(&self, user_id: i64) -> StoreResult<UserProgress>;

    /// Move the pointer to `new_house_id` and credit `xp_delta`
    ///
    /// Applies only when the pointer currently sits at `new_house_id - 1`;
    /// otherwise fails with [`StoreError::Conflict`] and changes nothing.
    async fn advance(&self, user_id: i64, new_house_id: i64, xp_delta: i64) -> StoreResult<UserProgress>;

    /// Append a chat entry and, when `xp_delta` is given, advance past
    /// `entry.house_id`, all in one transaction
    async fn record_attempt(&self, entry: NewChatEntry, xp_delta: Option<i64>) -> StoreResult<AttemptRecord>;

    /// Attempts for one house in creation order
    async fn chat_history(&self, user_id: i64, house_id: i64) -> StoreResult<Vec<ChatHistoryEntry>>;
}

/// User accounts and the paid-access flag
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert or refresh a user from proxy-asserted identity
    async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<User>;

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;

    /// Grant access; `false` when the user does not exist
    async fn activate_user(&self, user_id: i64) -> StoreResult<bool>;

    /// Record the payment provider's customer id; `false` when the user does not exist
    async fn update_stripe_customer_id(&self, user_id: i64, customer_id: &str) -> StoreResult<bool>;
}

/// Store used when no database is configured; every operation is `Unavailable`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn unavailable<T>(operation: &str) -> StoreResult<T> {
        tracing::warn!(operation, "Store operation skipped: database not available");
        Err(StoreError::Unavailable)
    }
}

#[async_trait]
impl ProgressStore for UnavailableStore {
    async fn get_progress(&self, _user_id: i64) -> StoreResult<Option<UserProgress>> {
        Self::unavailable("get_progress")
    }

    async fn create_progress(&self, _user_id: i64) -> StoreResult<UserProgress> {
        Self::unavailable("create_progress")
    }

    async fn advance(&self, _user_id: i64, _new_house_id: i64, _xp_delta: i64) -> StoreResult<UserProgress> {
        Self::unavailable("advance")
    }

    async fn record_attempt(&self, _entry: NewChatEntry, _xp_delta: Option<i64>) -> StoreResult<AttemptRecord> {
        Self::unavailable("record_attempt")
    }

    async fn chat_history(&self, _user_id: i64, _house_id: i64) -> StoreResult<Vec<ChatHistoryEntry>> {
        Self::unavailable("chat_history")
    }
}

#[async_trait]
impl AccountStore for UnavailableStore {
    async fn upsert_user(&self, _profile: &UserProfile) -> StoreResult<User> {
        Self::unavailable("upsert_user")
    }

    async fn get_user(&self, _user_id: i64) -> StoreResult<Option<User>> {
        Self::unavailable("get_user")
    }

    async fn activate_user(&self, _user_id: i64) -> StoreResult<bool> {
        Self::unavailable("activate_user")
    }

    async fn update_stripe_customer_id(&self, _user_id: i64, _customer_id: &str) -> StoreResult<bool> {
        Self::unavailable("update_stripe_customer_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_store_reports_unavailable() {
        let store = UnavailableStore;

        assert!(matches!(store.get_progress(1).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.create_progress(1).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.advance(1, 2, 10).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.chat_history(1, 1).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.activate_user(1).await, Err(StoreError::Unavailable)));
        assert!(matches!(
            store.upsert_user(&UserProfile::default()).await,
            Err(StoreError::Unavailable)
        ));
    }
}
