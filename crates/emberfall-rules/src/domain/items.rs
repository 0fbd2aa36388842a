//! Consumable items usable in combat.

use emberfall_character::domain::DamageType;
use emberfall_core::dice::DiceExpression;
use emberfall_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::conditions::ConditionType;

/// What drinking, applying or throwing an item does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEffect {
    /// Restores hit points to the user.
    Heal(DiceExpression),
    /// Removes a condition from the user.
    Cure(ConditionType),
    /// Damages the enemy, optionally applying a condition.
    Harm {
        /// Damage dice.
        damage: DiceExpression,
        /// Damage type.
        damage_type: DamageType,
        /// Condition applied to the enemy.
        condition: Option<ConditionType>,
    },
}

/// A catalog consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumable {
    /// Stable id, as stored in inventories.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Effect.
    pub effect: ItemEffect,
    /// Base value in gold.
    pub value: u32,
}

/// Rolled result of using a consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ItemOutcome {
    /// Hit points restored (before the max-HP cap).
    Healed {
        /// Amount rolled.
        amount: i32,
    },
    /// A condition removed.
    Cured {
        /// The cured condition.
        condition: ConditionType,
    },
    /// Damage dealt to the enemy.
    Harmed {
        /// Amount rolled.
        damage: i32,
        /// Damage type.
        damage_type: DamageType,
        /// Condition to apply.
        condition: Option<ConditionType>,
    },
}

const CATALOG: &[Consumable] = &[
    Consumable {
        id: "healing_potion",
        name: "Potion of Healing",
        effect: ItemEffect::Heal(DiceExpression::plain(2, 8, 2)),
        value: 50,
    },
    Consumable {
        id: "antitoxin",
        name: "Antitoxin",
        effect: ItemEffect::Cure(ConditionType::Poisoned),
        value: 25,
    },
    Consumable {
        id: "alchemist_fire",
        name: "Alchemist's Fire",
        effect: ItemEffect::Harm {
            damage: DiceExpression::plain(1, 6, 0),
            damage_type: DamageType::Fire,
            condition: Some(ConditionType::Burning),
        },
        value: 20,
    },
];

/// Looks up a consumable by id.
#[must_use]
pub fn consumable(id: &str) -> Option<&'static Consumable> {
    CATALOG.iter().find(|c| c.id == id)
}

/// Whether `id` names a combat consumable.
#[must_use]
pub fn is_consumable(id: &str) -> bool {
    consumable(id).is_some()
}

/// Rolls the item's effect.
pub fn use_consumable(item: &Consumable, rng: &mut dyn DeterministicRng) -> ItemOutcome {
    match item.effect {
        ItemEffect::Heal(dice) => ItemOutcome::Healed {
            amount: dice.roll(rng).max(1),
        },
        ItemEffect::Cure(condition) => ItemOutcome::Cured { condition },
        ItemEffect::Harm {
            damage,
            damage_type,
            condition,
        } => ItemOutcome::Harmed {
            damage: damage.roll(rng).max(1),
            damage_type,
            condition,
        },
    }
}
