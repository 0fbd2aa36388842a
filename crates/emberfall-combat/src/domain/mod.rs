//! Domain model for the Combat context.

pub mod actions;
pub mod bestiary;
pub mod encounter;
pub mod engine;
pub mod policy;

pub use actions::PlayerAction;
pub use bestiary::Bestiary;
pub use encounter::{EncounterSpec, RetreatPenalty};
pub use engine::{
    Combat, CombatLogEntry, CombatOutcome, CombatPhase, CombatResult, Combatant, InitiativeRoll,
    Side,
};
pub use policy::EnemyAction;
