//! Emberfall — Character Management bounded context.
//!
//! Responsible for the shared entity model used by player characters and
//! creatures: ability scores, skills, classes, equipment, the resource
//! ledger, and leveling.

pub mod domain;
