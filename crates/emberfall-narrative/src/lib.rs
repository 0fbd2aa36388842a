//! Emberfall — Narrative bounded context.
//!
//! Responsible for the story graph: node and choice schema, requirement
//! evaluation, effect application against the world record, the narrative
//! state machine with its suspension triggers, the conversation log, and
//! camp/exploration event tables.

pub mod domain;
