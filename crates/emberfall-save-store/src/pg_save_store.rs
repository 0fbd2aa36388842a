//! `PostgreSQL` implementation of the `KeyValueStore` trait.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;

use emberfall_core::error::DomainError;
use emberfall_core::storage::KeyValueStore;

use crate::schema::CREATE_SAVE_SLOTS_TABLE;

/// PostgreSQL-backed save slot store.
#[derive(Debug, Clone)]
pub struct PgSaveStore {
    pool: PgPool,
}

impl PgSaveStore {
    /// Creates a new `PgSaveStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `save_slots` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(CREATE_SAVE_SLOTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))?;
        Ok(())
    }
}

fn infrastructure(err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

#[async_trait]
impl KeyValueStore for PgSaveStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT record FROM save_slots WHERE slot_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| infrastructure(&e))?;
        Ok(row.map(|(Json(record),)| record))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO save_slots (slot_key, record, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (slot_key) DO UPDATE SET record = EXCLUDED.record, updated_at = NOW()",
        )
        .bind(key)
        .bind(Json(value))
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        debug!(slot = key, "save slot written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM save_slots WHERE slot_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))?;
        debug!(slot = key, removed = result.rows_affected(), "save slot deleted");
        Ok(())
    }
}
