//! Key-value persistence boundary.
//!
//! The engine never implements a storage medium. It hands serialized
//! snapshots to whatever implements [`KeyValueStore`] and treats every
//! failure as "nothing saved" / "nothing to load".

use async_trait::async_trait;

use crate::error::DomainError;

/// Asynchronous key-value store for save slots.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Loads the value stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), DomainError>;

    /// Removes the value stored under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}
