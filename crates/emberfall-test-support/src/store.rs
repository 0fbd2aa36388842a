//! Key-value store doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use emberfall_core::error::DomainError;
use emberfall_core::storage::KeyValueStore;

/// A store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    saves: Mutex<usize>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Seeds `key` with `value` without counting it as a save.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, key: &str, value: serde_json::Value) {
        self.entries.lock().unwrap().insert(key.to_owned(), value);
    }

    /// Number of successful `save` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), DomainError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A store whose every call fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn load(&self, _key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _key: &str, _value: &serde_json::Value) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
