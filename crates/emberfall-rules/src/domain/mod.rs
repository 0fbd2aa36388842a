//! Domain model for the Rules & Resolution context.

pub mod attacks;
pub mod checks;
pub mod conditions;
pub mod feats;
pub mod items;
pub mod spells;

pub use attacks::{AttackModifiers, AttackRollResult, DamageRoll};
pub use checks::{SavingThrowResult, SkillCheckResult};
pub use conditions::{
    Condition, ConditionCategory, ConditionModifiers, ConditionType, Decremented,
    PeriodicDamage, PeriodicDamageReport,
};
pub use feats::{AbilityFeatResult, AttackFeatResult, Feat, FeatError, FeatKind, PassiveBonuses};
pub use items::{Consumable, ItemEffect, ItemOutcome};
pub use spells::{CastContext, Spell, SpellCast, SpellEffect, SpellError, SpellOutcome};
