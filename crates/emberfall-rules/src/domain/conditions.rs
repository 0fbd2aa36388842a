//! Condition ledger: timed buffs and debuffs on a combatant.
//!
//! A combatant holds at most one live [`Condition`] per [`ConditionType`].
//! Reapplying refreshes the existing entry instead of stacking a second one.
//! [`aggregate`] is the single place combat reads condition-derived
//! modifiers from.

use emberfall_character::domain::{DamageType, SaveType};
use emberfall_core::dice::DiceExpression;
use emberfall_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

/// Every condition the rules know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    /// Divine favor on attacks and Will saves.
    Blessed,
    /// A shimmering force shield.
    Shielded,
    /// Invisible force armor.
    MageArmored,
    /// Battle fury.
    Raging,
    /// Actively evading blows.
    Dodging,
    /// Fighting defensively after a Combat Expertise swing.
    Defensive,
    /// Emboldened strikes.
    Inspired,
    /// Poison in the blood.
    Poisoned,
    /// On fire.
    Burning,
    /// An open wound.
    Bleeding,
    /// Reeling and unable to act.
    Stunned,
    /// Held rigid by magic.
    Paralyzed,
    /// Magically asleep; damage wakes the sleeper.
    Asleep,
    /// Shaken by fear.
    Frightened,
}

/// Whether a condition helps or hinders its holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionCategory {
    /// Helpful.
    Buff,
    /// Harmful.
    Debuff,
}

/// Damage rolled at the start of the holder's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicDamage {
    /// Damage dice.
    pub dice: DiceExpression,
    /// Damage type.
    pub damage_type: DamageType,
}

/// The numeric and boolean effects of one or more conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionModifiers {
    /// Weapon attack roll delta.
    pub attack: i32,
    /// Weapon damage delta.
    pub damage: i32,
    /// Armor class delta.
    pub armor_class: i32,
    /// Spell attack roll delta.
    pub spell_attack: i32,
    /// Spell save DC delta.
    pub spell_dc: i32,
    /// Fortitude save delta.
    pub fortitude: i32,
    /// Reflex save delta.
    pub reflex: i32,
    /// Will save delta.
    pub will: i32,
    /// Holder loses its turn.
    pub prevents_actions: bool,
    /// Holder cannot cast spells.
    pub prevents_spellcasting: bool,
    /// Per-turn damage; never summed by [`aggregate`].
    pub periodic_damage: Option<PeriodicDamage>,
}

impl ConditionModifiers {
    /// Save delta for `save`.
    #[must_use]
    pub fn save(&self, save: SaveType) -> i32 {
        match save {
            SaveType::Fortitude => self.fortitude,
            SaveType::Reflex => self.reflex,
            SaveType::Will => self.will,
        }
    }

    fn armor(armor_class: i32) -> Self {
        Self {
            armor_class,
            ..Self::default()
        }
    }

    fn periodic(count: u32, sides: u32, damage_type: DamageType) -> Self {
        Self {
            periodic_damage: Some(PeriodicDamage {
                dice: DiceExpression::plain(count, sides, 0),
                damage_type,
            }),
            ..Self::default()
        }
    }

    fn helpless(armor_class: i32) -> Self {
        Self {
            armor_class,
            prevents_actions: true,
            prevents_spellcasting: true,
            ..Self::default()
        }
    }
}

/// Static rule data for a condition type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDefinition {
    /// Buff or debuff.
    pub category: ConditionCategory,
    /// Human-readable description.
    pub description: &'static str,
    /// Duration in turns when applied without an override.
    pub default_duration: u32,
    /// Default modifier bundle.
    pub modifiers: ConditionModifiers,
}

impl ConditionType {
    /// Static rule data for this type.
    #[must_use]
    pub fn definition(self) -> ConditionDefinition {
        use ConditionCategory::{Buff, Debuff};

        let (category, description, default_duration, modifiers) = match self {
            Self::Blessed => (
                Buff,
                "+1 to attack rolls and Will saves",
                5,
                ConditionModifiers {
                    attack: 1,
                    will: 1,
                    ..ConditionModifiers::default()
                },
            ),
            Self::Shielded => (Buff, "+4 armor class", 5, ConditionModifiers::armor(4)),
            Self::MageArmored => (Buff, "+4 armor class", 10, ConditionModifiers::armor(4)),
            Self::Raging => (
                Buff,
                "+2 attack, damage and Will; -2 armor class",
                4,
                ConditionModifiers {
                    attack: 2,
                    damage: 2,
                    will: 2,
                    armor_class: -2,
                    ..ConditionModifiers::default()
                },
            ),
            Self::Dodging => (Buff, "+2 armor class", 3, ConditionModifiers::armor(2)),
            Self::Defensive => (Buff, "+1 armor class", 2, ConditionModifiers::armor(1)),
            Self::Inspired => (
                Buff,
                "+1 to attack and damage rolls",
                3,
                ConditionModifiers {
                    attack: 1,
                    damage: 1,
                    ..ConditionModifiers::default()
                },
            ),
            Self::Poisoned => (
                Debuff,
                "takes 1d4 poison damage each turn",
                3,
                ConditionModifiers::periodic(1, 4, DamageType::Poison),
            ),
            Self::Burning => (
                Debuff,
                "takes 1d6 fire damage each turn",
                2,
                ConditionModifiers::periodic(1, 6, DamageType::Fire),
            ),
            Self::Bleeding => (
                Debuff,
                "takes 1d4 damage each turn",
                3,
                ConditionModifiers::periodic(1, 4, DamageType::Slashing),
            ),
            Self::Stunned => (Debuff, "loses its next action", 1, ConditionModifiers::helpless(-2)),
            Self::Paralyzed => (
                Debuff,
                "cannot move or act",
                2,
                ConditionModifiers::helpless(-4),
            ),
            Self::Asleep => (
                Debuff,
                "sleeps until woken by damage",
                3,
                ConditionModifiers::helpless(-4),
            ),
            Self::Frightened => (
                Debuff,
                "-2 to attack rolls and saves",
                3,
                ConditionModifiers {
                    attack: -2,
                    fortitude: -2,
                    reflex: -2,
                    will: -2,
                    ..ConditionModifiers::default()
                },
            ),
        };

        ConditionDefinition {
            category,
            description,
            default_duration,
            modifiers,
        }
    }

    /// Display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Blessed => "Blessed",
            Self::Shielded => "Shielded",
            Self::MageArmored => "Mage Armor",
            Self::Raging => "Raging",
            Self::Dodging => "Dodging",
            Self::Defensive => "Defensive",
            Self::Inspired => "Inspired",
            Self::Poisoned => "Poisoned",
            Self::Burning => "Burning",
            Self::Bleeding => "Bleeding",
            Self::Stunned => "Stunned",
            Self::Paralyzed => "Paralyzed",
            Self::Asleep => "Asleep",
            Self::Frightened => "Frightened",
        }
    }
}

/// A live condition on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type tag.
    pub condition_type: ConditionType,
    /// Buff or debuff.
    pub category: ConditionCategory,
    /// Human-readable description.
    pub description: String,
    /// Turns until expiry.
    pub turns_remaining: u32,
    /// Effective modifier bundle.
    pub modifiers: ConditionModifiers,
    /// Turn the condition was (re)applied on.
    pub applied_on_turn: u32,
}

/// Result of [`decrement`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decremented {
    /// Conditions still active.
    pub remaining: Vec<Condition>,
    /// Conditions that ran out this tick.
    pub expired: Vec<Condition>,
}

/// One condition's share of a periodic damage tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicDamageEntry {
    /// The condition that dealt the damage.
    pub condition_type: ConditionType,
    /// Damage rolled.
    pub amount: i32,
    /// Damage type.
    pub damage_type: DamageType,
}

/// Periodic damage rolled for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicDamageReport {
    /// Per-condition breakdown.
    pub entries: Vec<PeriodicDamageEntry>,
    /// Sum of all entries.
    pub total: i32,
}

/// Applies `condition_type` with its default modifiers.
///
/// An existing instance is refreshed to the (overridden or default)
/// duration and its applied turn reset.
#[must_use]
pub fn apply(
    existing: &[Condition],
    condition_type: ConditionType,
    current_turn: u32,
    duration_override: Option<u32>,
) -> Vec<Condition> {
    let modifiers = condition_type.definition().modifiers;
    apply_with_modifiers(
        existing,
        condition_type,
        current_turn,
        duration_override,
        modifiers,
    )
}

/// Applies `condition_type` with an overridden modifier bundle.
///
/// Keeps the single-instance rule of [`apply`]; the refreshed entry takes
/// the new bundle.
#[must_use]
pub fn apply_with_modifiers(
    existing: &[Condition],
    condition_type: ConditionType,
    current_turn: u32,
    duration_override: Option<u32>,
    modifiers: ConditionModifiers,
) -> Vec<Condition> {
    let definition = condition_type.definition();
    let duration = duration_override.unwrap_or(definition.default_duration);
    let mut next = existing.to_vec();

    if let Some(current) = next
        .iter_mut()
        .find(|c| c.condition_type == condition_type)
    {
        current.turns_remaining = duration;
        current.applied_on_turn = current_turn;
        current.modifiers = modifiers;
        tracing::debug!(?condition_type, duration, "condition refreshed");
    } else {
        next.push(Condition {
            condition_type,
            category: definition.category,
            description: definition.description.to_owned(),
            turns_remaining: duration,
            modifiers,
            applied_on_turn: current_turn,
        });
        tracing::debug!(?condition_type, duration, "condition applied");
    }
    next
}

/// Ticks every condition down by one turn.
#[must_use]
pub fn decrement(conditions: &[Condition]) -> Decremented {
    let mut result = Decremented::default();
    for condition in conditions {
        let mut ticked = condition.clone();
        ticked.turns_remaining = ticked.turns_remaining.saturating_sub(1);
        if ticked.turns_remaining == 0 {
            result.expired.push(ticked);
        } else {
            result.remaining.push(ticked);
        }
    }
    result
}

/// Sums numeric modifiers and ORs prevention flags across `conditions`.
///
/// Periodic damage is left out; see [`roll_periodic_damage`].
#[must_use]
pub fn aggregate(conditions: &[Condition]) -> ConditionModifiers {
    conditions
        .iter()
        .fold(ConditionModifiers::default(), |acc, condition| {
            let m = &condition.modifiers;
            ConditionModifiers {
                attack: acc.attack + m.attack,
                damage: acc.damage + m.damage,
                armor_class: acc.armor_class + m.armor_class,
                spell_attack: acc.spell_attack + m.spell_attack,
                spell_dc: acc.spell_dc + m.spell_dc,
                fortitude: acc.fortitude + m.fortitude,
                reflex: acc.reflex + m.reflex,
                will: acc.will + m.will,
                prevents_actions: acc.prevents_actions || m.prevents_actions,
                prevents_spellcasting: acc.prevents_spellcasting || m.prevents_spellcasting,
                periodic_damage: None,
            }
        })
}

/// Rolls each periodic damage source once.
pub fn roll_periodic_damage(
    conditions: &[Condition],
    rng: &mut dyn DeterministicRng,
) -> PeriodicDamageReport {
    let entries: Vec<PeriodicDamageEntry> = conditions
        .iter()
        .filter_map(|condition| {
            condition
                .modifiers
                .periodic_damage
                .map(|periodic| PeriodicDamageEntry {
                    condition_type: condition.condition_type,
                    amount: periodic.dice.roll(rng).max(0),
                    damage_type: periodic.damage_type,
                })
        })
        .collect();
    let total = entries.iter().map(|e| e.amount).sum();
    PeriodicDamageReport { entries, total }
}

/// Removes `condition_type` (a cure).
#[must_use]
pub fn remove(conditions: &[Condition], condition_type: ConditionType) -> Vec<Condition> {
    conditions
        .iter()
        .filter(|c| c.condition_type != condition_type)
        .cloned()
        .collect()
}

/// Whether `condition_type` is live.
#[must_use]
pub fn has(conditions: &[Condition], condition_type: ConditionType) -> bool {
    conditions.iter().any(|c| c.condition_type == condition_type)
}

/// One-line summary such as `Blessed (3), Poisoned (1)`.
#[must_use]
pub fn summary(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| format!("{} ({})", c.condition_type.display_name(), c.turns_remaining))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use emberfall_test_support::SequenceRng;

    use super::*;

    #[test]
    fn test_apply_adds_condition_from_definition() {
        let conditions = apply(&[], ConditionType::Shielded, 1, None);

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].turns_remaining, 5);
        assert_eq!(conditions[0].modifiers.armor_class, 4);
        assert_eq!(conditions[0].category, ConditionCategory::Buff);
    }

    #[test]
    fn test_reapply_refreshes_instead_of_stacking() {
        let first = apply(&[], ConditionType::Poisoned, 1, None);
        let ticked = decrement(&first).remaining;
        assert_eq!(ticked[0].turns_remaining, 2);

        let refreshed = apply(&ticked, ConditionType::Poisoned, 4, None);

        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].turns_remaining, 3);
        assert_eq!(refreshed[0].applied_on_turn, 4);
    }

    #[test]
    fn test_duration_override_is_used_on_refresh() {
        let first = apply(&[], ConditionType::Blessed, 1, Some(2));
        let refreshed = apply(&first, ConditionType::Blessed, 2, Some(7));

        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].turns_remaining, 7);
    }

    #[test]
    fn test_decrement_is_monotonic_and_expires_at_zero() {
        let conditions = apply(
            &apply(&[], ConditionType::Stunned, 1, None),
            ConditionType::Raging,
            1,
            None,
        );

        let ticked = decrement(&conditions);

        assert_eq!(ticked.expired.len(), 1);
        assert_eq!(ticked.expired[0].condition_type, ConditionType::Stunned);
        assert_eq!(ticked.remaining.len(), 1);
        assert_eq!(ticked.remaining[0].turns_remaining, 3);

        let again = decrement(&ticked.remaining);
        assert!(
            again
                .remaining
                .iter()
                .all(|c| c.condition_type != ConditionType::Stunned)
        );
        assert_eq!(again.remaining[0].turns_remaining, 2);
    }

    #[test]
    fn test_aggregate_sums_and_cancels() {
        let conditions = apply(
            &apply(&[], ConditionType::Raging, 1, None),
            ConditionType::Shielded,
            1,
            None,
        );
        let conditions = apply(&conditions, ConditionType::Frightened, 1, None);

        let total = aggregate(&conditions);

        assert_eq!(total.armor_class, 2);
        assert_eq!(total.attack, 0);
        assert_eq!(total.will, 0);
        assert_eq!(total.damage, 2);
        assert!(!total.prevents_actions);
    }

    #[test]
    fn test_aggregate_ors_flags_and_skips_periodic_damage() {
        let conditions = apply(
            &apply(&[], ConditionType::Poisoned, 1, None),
            ConditionType::Paralyzed,
            1,
            None,
        );

        let total = aggregate(&conditions);

        assert!(total.prevents_actions);
        assert!(total.prevents_spellcasting);
        assert_eq!(total.periodic_damage, None);
    }

    #[test]
    fn test_apply_with_modifiers_overrides_bundle() {
        let conditions = apply_with_modifiers(
            &[],
            ConditionType::Defensive,
            1,
            None,
            ConditionModifiers {
                armor_class: 3,
                ..ConditionModifiers::default()
            },
        );
        let conditions = apply(&conditions, ConditionType::Defensive, 2, None);

        assert_eq!(conditions.len(), 1);
        assert_eq!(aggregate(&conditions).armor_class, 1);
    }

    #[test]
    fn test_periodic_damage_breakdown_and_total() {
        let conditions = apply(
            &apply(&[], ConditionType::Poisoned, 1, None),
            ConditionType::Burning,
            1,
            None,
        );
        let mut rng = SequenceRng::new(vec![3, 5]);

        let report = roll_periodic_damage(&conditions, &mut rng);

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].amount, 3);
        assert_eq!(report.entries[1].damage_type, DamageType::Fire);
        assert_eq!(report.total, 8);
    }

    #[test]
    fn test_remove_cures_only_named_condition() {
        let conditions = apply(
            &apply(&[], ConditionType::Poisoned, 1, None),
            ConditionType::Blessed,
            1,
            None,
        );

        let cured = remove(&conditions, ConditionType::Poisoned);

        assert!(!has(&cured, ConditionType::Poisoned));
        assert!(has(&cured, ConditionType::Blessed));
        assert_eq!(summary(&cured), "Blessed (5)");
    }
}
