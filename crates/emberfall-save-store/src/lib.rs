//! Emberfall Save Store — durable save slots.
//!
//! Implements the [`emberfall_core::storage::KeyValueStore`] boundary on top
//! of a `PostgreSQL` table holding one JSON document per slot key.

pub mod pg_save_store;
pub mod schema;
