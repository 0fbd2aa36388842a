//! Integration tests for `PgSaveStore`.
//!
//! These need a reachable `PostgreSQL` at `DATABASE_URL`; run them with
//! `cargo test -- --ignored`.

use emberfall_core::storage::KeyValueStore;
use emberfall_save_store::pg_save_store::PgSaveStore;
use serde_json::json;
use sqlx::PgPool;

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_missing_slot_returns_none(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    let loaded = store.load("emberfall:save:missing").await.unwrap();

    assert!(loaded.is_none());
}

// --- save + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_then_load_returns_record(pool: PgPool) {
    // Arrange
    let store = PgSaveStore::new(pool);
    let record = json!({ "version": 3, "character": { "name": "Brannoc" } });

    // Act
    store.save("emberfall:save:a", &record).await.unwrap();
    let loaded = store.load("emberfall:save:a").await.unwrap();

    // Assert
    assert_eq!(loaded, Some(record));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_overwrites_existing_slot(pool: PgPool) {
    let store = PgSaveStore::new(pool.clone());
    store.save("slot", &json!({ "version": 2 })).await.unwrap();

    store.save("slot", &json!({ "version": 3 })).await.unwrap();

    assert_eq!(store.load("slot").await.unwrap(), Some(json!({ "version": 3 })));
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM save_slots")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// --- delete ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_removes_slot(pool: PgPool) {
    let store = PgSaveStore::new(pool);
    store.save("slot", &json!({ "version": 3 })).await.unwrap();

    store.delete("slot").await.unwrap();

    assert!(store.load("slot").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_missing_slot_succeeds(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    let result = store.delete("never-written").await;

    assert!(result.is_ok());
}

// --- ensure_schema ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_ensure_schema_is_idempotent(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();

    store.save("slot", &json!({ "version": 3 })).await.unwrap();
    assert!(store.load("slot").await.unwrap().is_some());
}
