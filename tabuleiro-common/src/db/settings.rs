//! Runtime settings stored in the `settings` table
//!
//! All values have built-in defaults. NULL or missing database values are
//! replaced with defaults and written back.

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

pub const APPROVAL_REWARD_XP_KEY: &str = "approval_reward_xp";
pub const MIN_ANSWER_CHARS_KEY: &str = "min_answer_chars";
pub const WEBHOOK_TOLERANCE_SECS_KEY: &str = "webhook_tolerance_secs";

pub const DEFAULT_APPROVAL_REWARD_XP: i64 = 10;
pub const DEFAULT_MIN_ANSWER_CHARS: usize = 10;
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Runtime settings loaded from database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// XP credited per approved answer; also the ceiling for oracle-supplied rewards
    pub approval_reward_xp: i64,
    /// Minimum answer length in characters
    pub min_answer_chars: usize,
    /// Maximum age of a signed webhook delivery
    pub webhook_tolerance_secs: i64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            approval_reward_xp: DEFAULT_APPROVAL_REWARD_XP,
            min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        }
    }
}

impl RuntimeSettings {
    /// Load runtime settings from database
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let settings = Self {
            approval_reward_xp: get_setting(pool, APPROVAL_REWARD_XP_KEY, DEFAULT_APPROVAL_REWARD_XP)
                .await?,
            min_answer_chars: get_setting(pool, MIN_ANSWER_CHARS_KEY, DEFAULT_MIN_ANSWER_CHARS).await?,
            webhook_tolerance_secs: get_setting(
                pool,
                WEBHOOK_TOLERANCE_SECS_KEY,
                DEFAULT_WEBHOOK_TOLERANCE_SECS,
            )
            .await?,
        };

        if settings.approval_reward_xp <= 0 {
            return Err(Error::Config(format!(
                "{} must be positive, got {}",
                APPROVAL_REWARD_XP_KEY, settings.approval_reward_xp
            )));
        }

        info!(
            approval_reward_xp = settings.approval_reward_xp,
            min_answer_chars = settings.min_answer_chars,
            "Loaded runtime settings from database"
        );
        Ok(settings)
    }
}

/// Ensure every known setting has a value
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, APPROVAL_REWARD_XP_KEY, &DEFAULT_APPROVAL_REWARD_XP.to_string()).await?;
    ensure_setting(pool, MIN_ANSWER_CHARS_KEY, &DEFAULT_MIN_ANSWER_CHARS.to_string()).await?;
    ensure_setting(
        pool,
        WEBHOOK_TOLERANCE_SECS_KEY,
        &DEFAULT_WEBHOOK_TOLERANCE_SECS.to_string(),
    )
    .await?;
    Ok(())
}

/// Insert a setting when missing, or reset it when NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read a setting, writing the default back when missing or NULL
async fn get_setting<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("Invalid value for setting '{}': {}", key, e))),
        None => {
            info!(
                "Setting '{}' not found in database, using default: {}",
                key,
                default.to_string()
            );
            set_setting(pool, key, &default.to_string()).await?;
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn test_defaults_loaded_on_fresh_database() {
        let pool = init_memory_database().await.unwrap();
        let settings = RuntimeSettings::load(&pool).await.unwrap();
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[tokio::test]
    async fn test_custom_value_survives_reinit() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, APPROVAL_REWARD_XP_KEY, "25").await.unwrap();

        init_default_settings(&pool).await.unwrap();

        let settings = RuntimeSettings::load(&pool).await.unwrap();
        assert_eq!(settings.approval_reward_xp, 25);
    }

    #[tokio::test]
    async fn test_null_value_reset_to_default() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("UPDATE settings SET value = NULL WHERE key = ?")
            .bind(MIN_ANSWER_CHARS_KEY)
            .execute(&pool)
            .await
            .unwrap();

        let settings = RuntimeSettings::load(&pool).await.unwrap();
        assert_eq!(settings.min_answer_chars, DEFAULT_MIN_ANSWER_CHARS);

        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(MIN_ANSWER_CHARS_KEY)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_invalid_value_is_config_error() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, WEBHOOK_TOLERANCE_SECS_KEY, "soon").await.unwrap();

        let err = RuntimeSettings::load(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_non_positive_reward_rejected() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, APPROVAL_REWARD_XP_KEY, "0").await.unwrap();

        let err = RuntimeSettings::load(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
