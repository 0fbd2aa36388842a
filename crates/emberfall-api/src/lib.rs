//! Emberfall — HTTP surface.
//!
//! Exposes game sessions over JSON. The binary in `main.rs` wires the
//! router to `PostgreSQL` save slots and a campaign file; tests build the
//! same router over in-memory doubles.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
