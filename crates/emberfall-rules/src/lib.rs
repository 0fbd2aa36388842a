//! Emberfall — Rules & Resolution bounded context.
//!
//! Responsible for the static rule tables and the pure resolvers built on
//! them: skill and save math, armor class, the condition ledger, the feat
//! and spell catalogs, attack and damage rolls, and consumable items.

pub mod domain;
