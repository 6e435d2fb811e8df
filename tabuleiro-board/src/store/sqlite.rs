//! SQLite-backed store

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tabuleiro_common::db::{
    ChatHistoryEntry, NewChatEntry, User, UserProfile, UserProgress, ROLE_ADMIN, ROLE_USER,
};
use tabuleiro_common::time;

use super::{AccountStore, AttemptRecord, ProgressStore, StoreError, StoreResult};
use crate::houses::{COMPLETED_HOUSE_ID, FIRST_HOUSE_ID, HOUSE_COUNT};

const PROGRESS_COLUMNS: &str =
    "id, user_id, current_house_id, xp_points, completed_at, created_at, updated_at";

const USER_COLUMNS: &str = "id, open_id, name, email, login_method, role, is_active, \
     stripe_customer_id, created_at, updated_at, last_signed_in";

/// Store over the shared `tabuleiro.db` pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    owner_open_id: Option<String>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            owner_open_id: None,
        }
    }

    /// Promote the account with this open-id to admin on upsert
    pub fn with_owner(mut self, owner_open_id: Option<String>) -> Self {
        self.owner_open_id = owner_open_id;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn fetch_progress(conn: &mut SqliteConnection, user_id: i64) -> StoreResult<Option<UserProgress>> {
    let sql = format!("SELECT {} FROM user_progress WHERE user_id = ?", PROGRESS_COLUMNS);
    let progress = sqlx::query_as::<_, UserProgress>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(progress)
}

/// Conditional advance on an open connection or transaction
///
/// A single UPDATE guarded on the expected pointer, so two racing
/// submissions for the same house cannot both apply.
async fn advance_on(
    conn: &mut SqliteConnection,
    user_id: i64,
    new_house_id: i64,
    xp_delta: i64,
) -> StoreResult<UserProgress> {
    if !(FIRST_HOUSE_ID + 1..=COMPLETED_HOUSE_ID).contains(&new_house_id) {
        return Err(StoreError::InvalidAdvance(format!(
            "house {} is not a valid advance target",
            new_house_id
        )));
    }
    if xp_delta < 0 {
        return Err(StoreError::InvalidAdvance(format!(
            "negative xp delta {}",
            xp_delta
        )));
    }

    let expected = new_house_id - 1;
    let now = time::now();

    let result = sqlx::query(
        r#"
        UPDATE user_progress
        SET current_house_id = ?,
            xp_points = xp_points + ?,
            completed_at = CASE WHEN ? > ? THEN COALESCE(completed_at, ?) ELSE NULL END,
            updated_at = ?
        WHERE user_id = ? AND current_house_id = ?
        "#,
    )
    .bind(new_house_id)
    .bind(xp_delta)
    .bind(new_house_id)
    .bind(HOUSE_COUNT)
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    let current = fetch_progress(&mut *conn, user_id)
        .await?
        .ok_or(StoreError::ProgressNotFound(user_id))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict {
            user_id,
            expected,
            current: current.current_house_id,
        });
    }

    tracing::debug!(
        user_id,
        current_house_id = current.current_house_id,
        xp_points = current.xp_points,
        "Advanced progress"
    );
    Ok(current)
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn get_progress(&self, user_id: i64) -> StoreResult<Option<UserProgress>> {
        let mut conn = self.pool.acquire().await?;
        fetch_progress(&mut conn, user_id).await
    }

    async fn create_progress(&self, user_id: i64) -> StoreResult<UserProgress> {
        let now = time::now();
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, current_house_id, xp_points, completed_at, created_at, updated_at)
            VALUES (?, ?, 0, NULL, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(FIRST_HOUSE_ID)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id, "Created initial progress");
        }

        fetch_progress(&mut conn, user_id)
            .await?
            .ok_or(StoreError::ProgressNotFound(user_id))
    }

    async fn advance(&self, user_id: i64, new_house_id: i64, xp_delta: i64) -> StoreResult<UserProgress> {
        let mut conn = self.pool.acquire().await?;
        advance_on(&mut conn, user_id, new_house_id, xp_delta).await
    }

    async fn record_attempt(&self, entry: NewChatEntry, xp_delta: Option<i64>) -> StoreResult<AttemptRecord> {
        let now = time::now();
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, ChatHistoryEntry>(
            r#"
            INSERT INTO chat_history (user_id, house_id, user_message, mentor_response, approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, house_id, user_message, mentor_response, approved, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.house_id)
        .bind(&entry.user_message)
        .bind(&entry.mentor_response)
        .bind(entry.approved)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping `tx` on error rolls back the chat entry as well
        let progress = match xp_delta {
            Some(xp) => Some(advance_on(&mut tx, entry.user_id, entry.house_id + 1, xp).await?),
            None => None,
        };

        tx.commit().await?;

        Ok(AttemptRecord {
            entry: saved,
            progress,
        })
    }

    async fn chat_history(&self, user_id: i64, house_id: i64) -> StoreResult<Vec<ChatHistoryEntry>> {
        let entries = sqlx::query_as::<_, ChatHistoryEntry>(
            r#"
            SELECT id, user_id, house_id, user_message, mentor_response, approved, created_at
            FROM chat_history
            WHERE user_id = ? AND house_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .bind(house_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<User> {
        let now = time::now();
        let is_owner = self.owner_open_id.as_deref() == Some(profile.open_id.as_str());
        let role = if is_owner { ROLE_ADMIN } else { ROLE_USER };

        sqlx::query(
            r#"
            INSERT INTO users (open_id, name, email, login_method, role, is_active, created_at, updated_at, last_signed_in)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            ON CONFLICT(open_id) DO UPDATE SET
                name = COALESCE(excluded.name, users.name),
                email = COALESCE(excluded.email, users.email),
                login_method = COALESCE(excluded.login_method, users.login_method),
                role = CASE WHEN excluded.role = 'admin' THEN 'admin' ELSE users.role END,
                updated_at = excluded.updated_at,
                last_signed_in = excluded.last_signed_in
            "#,
        )
        .bind(&profile.open_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.login_method)
        .bind(role)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {} FROM users WHERE open_id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&profile.open_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn activate_user(&self, user_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = 1, updated_at = ? WHERE id = ?")
            .bind(time::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_stripe_customer_id(&self, user_id: i64, customer_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET stripe_customer_id = ?, updated_at = ? WHERE id = ?")
            .bind(customer_id)
            .bind(time::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabuleiro_common::db::init_memory_database;

    async fn store_with_user(open_id: &str) -> (SqliteStore, User) {
        let pool = init_memory_database().await.unwrap();
        let store = SqliteStore::new(pool);
        let user = store
            .upsert_user(&UserProfile {
                open_id: open_id.to_string(),
                ..UserProfile::default()
            })
            .await
            .unwrap();
        (store, user)
    }

    fn entry(user_id: i64, house_id: i64, approved: bool) -> NewChatEntry {
        NewChatEntry {
            user_id,
            house_id,
            user_message: format!("resposta para casa {}", house_id),
            mentor_response: "feedback".to_string(),
            approved,
        }
    }

    #[tokio::test]
    async fn test_create_progress_defaults_and_is_idempotent() {
        let (store, user) = store_with_user("alice").await;

        assert!(store.get_progress(user.id).await.unwrap().is_none());

        let first = store.create_progress(user.id).await.unwrap();
        assert_eq!(first.current_house_id, 1);
        assert_eq!(first.xp_points, 0);
        assert!(first.completed_at.is_none());

        let second = store.create_progress(user.id).await.unwrap();
        assert_eq!(first, second);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_progress WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_advance_moves_pointer_and_credits_xp() {
        let (store, user) = store_with_user("bob").await;
        store.create_progress(user.id).await.unwrap();

        let progress = store.advance(user.id, 2, 10).await.unwrap();
        assert_eq!(progress.current_house_id, 2);
        assert_eq!(progress.xp_points, 10);
        assert!(progress.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_stale_advance_conflicts_without_change() {
        let (store, user) = store_with_user("carol").await;
        store.create_progress(user.id).await.unwrap();
        store.advance(user.id, 2, 10).await.unwrap();

        let err = store.advance(user.id, 2, 10).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                current: 2,
                ..
            }
        ));

        let progress = store.get_progress(user.id).await.unwrap().unwrap();
        assert_eq!(progress.current_house_id, 2);
        assert_eq!(progress.xp_points, 10);
    }

    #[tokio::test]
    async fn test_advance_rejects_skips_and_negative_xp() {
        let (store, user) = store_with_user("dave").await;
        store.create_progress(user.id).await.unwrap();

        assert!(matches!(
            store.advance(user.id, 3, 10).await,
            Err(StoreError::Conflict { .. })
        ));
        assert!(matches!(
            store.advance(user.id, 22, 10).await,
            Err(StoreError::InvalidAdvance(_))
        ));
        assert!(matches!(
            store.advance(user.id, 1, 10).await,
            Err(StoreError::InvalidAdvance(_))
        ));
        assert!(matches!(
            store.advance(user.id, 2, -1).await,
            Err(StoreError::InvalidAdvance(_))
        ));
    }

    #[tokio::test]
    async fn test_advance_without_progress_is_not_found() {
        let (store, user) = store_with_user("erin").await;
        assert!(matches!(
            store.advance(user.id, 2, 10).await,
            Err(StoreError::ProgressNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_final_advance_sets_completed_at() {
        let (store, user) = store_with_user("frank").await;
        store.create_progress(user.id).await.unwrap();
        for next in 2..=20 {
            store.advance(user.id, next, 10).await.unwrap();
        }

        let before = store.get_progress(user.id).await.unwrap().unwrap();
        assert!(before.completed_at.is_none());

        let done = store.advance(user.id, 21, 10).await.unwrap();
        assert_eq!(done.current_house_id, COMPLETED_HOUSE_ID);
        assert_eq!(done.xp_points, 200);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_record_attempt_rejected_only_appends() {
        let (store, user) = store_with_user("gina").await;
        store.create_progress(user.id).await.unwrap();

        let record = store.record_attempt(entry(user.id, 1, false), None).await.unwrap();
        assert!(record.progress.is_none());
        assert!(!record.entry.approved);

        let progress = store.get_progress(user.id).await.unwrap().unwrap();
        assert_eq!(progress.current_house_id, 1);
        assert_eq!(store.chat_history(user.id, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_attempt_approved_appends_and_advances() {
        let (store, user) = store_with_user("hugo").await;
        store.create_progress(user.id).await.unwrap();

        let record = store.record_attempt(entry(user.id, 1, true), Some(10)).await.unwrap();
        let progress = record.progress.unwrap();
        assert_eq!(progress.current_house_id, 2);
        assert_eq!(progress.xp_points, 10);
        assert!(record.entry.approved);
    }

    #[tokio::test]
    async fn test_record_attempt_conflict_rolls_back_history() {
        let (store, user) = store_with_user("iris").await;
        store.create_progress(user.id).await.unwrap();
        store.advance(user.id, 2, 10).await.unwrap();

        let err = store
            .record_attempt(entry(user.id, 1, true), Some(10))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        assert!(store.chat_history(user.id, 1).await.unwrap().is_empty());
        let progress = store.get_progress(user.id).await.unwrap().unwrap();
        assert_eq!(progress.xp_points, 10);
    }

    #[tokio::test]
    async fn test_chat_history_filters_by_house_in_creation_order() {
        let (store, user) = store_with_user("jack").await;
        store.create_progress(user.id).await.unwrap();

        let mut first = entry(user.id, 1, false);
        first.user_message = "primeira".to_string();
        let mut second = entry(user.id, 1, false);
        second.user_message = "segunda".to_string();

        store.record_attempt(first, None).await.unwrap();
        store.record_attempt(entry(user.id, 2, false), None).await.unwrap();
        store.record_attempt(second, None).await.unwrap();

        let history = store.chat_history(user.id, 1).await.unwrap();
        let messages: Vec<&str> = history.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(messages, vec!["primeira", "segunda"]);
        assert!(history.iter().all(|e| e.house_id == 1));
    }

    #[tokio::test]
    async fn test_upsert_user_refreshes_profile_and_keeps_flags() {
        let (store, user) = store_with_user("kate").await;
        assert_eq!(user.role, ROLE_USER);
        assert!(!user.is_active);

        store.activate_user(user.id).await.unwrap();

        let updated = store
            .upsert_user(&UserProfile {
                open_id: "kate".to_string(),
                name: Some("Kate".to_string()),
                email: Some("kate@example.com".to_string()),
                login_method: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.name.as_deref(), Some("Kate"));
        assert_eq!(updated.email.as_deref(), Some("kate@example.com"));
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn test_owner_promoted_to_admin() {
        let pool = init_memory_database().await.unwrap();
        let store = SqliteStore::new(pool).with_owner(Some("owner".to_string()));

        let owner = store
            .upsert_user(&UserProfile {
                open_id: "owner".to_string(),
                ..UserProfile::default()
            })
            .await
            .unwrap();
        let other = store
            .upsert_user(&UserProfile {
                open_id: "other".to_string(),
                ..UserProfile::default()
            })
            .await
            .unwrap();

        assert_eq!(owner.role, ROLE_ADMIN);
        assert_eq!(other.role, ROLE_USER);
    }

    #[tokio::test]
    async fn test_activation_and_customer_id_are_idempotent() {
        let (store, user) = store_with_user("liam").await;

        assert!(store.activate_user(user.id).await.unwrap());
        assert!(store.activate_user(user.id).await.unwrap());
        assert!(store.update_stripe_customer_id(user.id, "cus_123").await.unwrap());
        assert!(store.update_stripe_customer_id(user.id, "cus_123").await.unwrap());

        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert!(reloaded.is_active);
        assert_eq!(reloaded.stripe_customer_id.as_deref(), Some("cus_123"));

        assert!(!store.activate_user(9_999).await.unwrap());
        assert!(!store.update_stripe_customer_id(9_999, "cus_x").await.unwrap());
    }
}
