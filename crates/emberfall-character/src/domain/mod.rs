//! Domain model for the Character Management context.

pub mod abilities;
pub mod classes;
pub mod entity;
pub mod equipment;
pub mod leveling;
pub mod resources;
pub mod skills;

pub use abilities::{Ability, AbilityScores};
pub use classes::{CasterTradition, CharacterClass};
pub use entity::{Character, Creature, SaveBonuses, SaveType, StatBlock};
pub use equipment::{Armor, DamageType, Equipment, Shield, Weapon};
pub use leveling::{DEFAULT_CHARACTER_NAME, MAX_LEVEL, default_character, xp_for_level};
pub use resources::{
    LimitedAbility, ResourceFailure, ResourceLedger, ResourceRef, SpellSlotPool, UsageKind,
};
pub use skills::Skill;
