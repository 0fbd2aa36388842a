//! Emberfall — Combat bounded context.
//!
//! Responsible for the bestiary, encounter definitions, and the turn-based
//! combat state machine: initiative, per-turn condition ticking, action
//! resolution for both sides, and victory/defeat/retreat detection.

pub mod domain;
