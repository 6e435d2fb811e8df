//! Integration tests for on-disk database initialization

use tabuleiro_common::db::{init_database, RuntimeSettings};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("tabuleiro.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tabuleiro.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tabuleiro.db");
    let pool = init_database(&db_path).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);

    let settings = RuntimeSettings::load(&pool).await.unwrap();
    assert_eq!(settings.approval_reward_xp, 10);
}

#[tokio::test]
async fn test_foreign_keys_cascade_progress_with_user() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tabuleiro.db");
    let pool = init_database(&db_path).await.unwrap();
    let now = tabuleiro_common::time::now();

    sqlx::query(
        "INSERT INTO users (open_id, created_at, updated_at, last_signed_in) VALUES ('cascade', ?, ?, ?)",
    )
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();
    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE open_id = 'cascade'")
        .fetch_one(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO user_progress (user_id, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_progress")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
