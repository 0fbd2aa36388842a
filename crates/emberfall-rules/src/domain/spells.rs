//! Spell catalog and spellcasting resolver.
//!
//! Each spell has one of three shapes. Self buffs always succeed and hand
//! back a condition for the caller to register. Attack-roll spells hit on
//! `d20 + BAB + casting modifier >= AC` (natural 20 auto-hits and doubles
//! the dice). Saving-throw spells check target eligibility first, then let
//! the target save against the caster's DC with "negates" or "half"
//! semantics.

use emberfall_character::domain::resources::{self, ResourceFailure, ResourceRef};
use emberfall_character::domain::{DamageType, SaveType, StatBlock};
use emberfall_core::dice::DiceExpression;
use emberfall_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::attacks::{AttackRollResult, resolve_attack_roll};
use super::checks::{self, SavingThrowResult, casting_ability_modifier, spell_save_dc};
use super::conditions::{Condition, ConditionModifiers, ConditionType, aggregate};

/// Who a spell targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpellTarget {
    /// The caster.
    Caster,
    /// The opposing combatant.
    Enemy,
}

/// What a successful save does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveEffect {
    /// No effect at all.
    Negates,
    /// Half damage (floored) and no condition.
    Half,
}

/// A target-eligibility predicate checked before any save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetRequirement {
    /// Target's current HP must not exceed the value.
    MaxHp(i32),
}

/// The shape of a spell's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellEffect {
    /// Damage on a successful spell attack roll.
    AttackRoll {
        /// Damage dice.
        damage: DiceExpression,
        /// Damage type.
        damage_type: DamageType,
    },
    /// Damage and/or a condition resisted by a saving throw.
    SavingThrow {
        /// Save rolled by the target.
        save: SaveType,
        /// Effect of a successful save.
        on_success: SaveEffect,
        /// Damage dice and type, if the spell deals damage.
        damage: Option<(DiceExpression, DamageType)>,
        /// Condition applied on a failed save.
        condition: Option<ConditionType>,
    },
    /// A condition on the caster with a spell-defined magnitude.
    Buff {
        /// The condition registered by the caller.
        condition: ConditionType,
        /// Magnitude of the buff.
        modifiers: ConditionModifiers,
        /// Duration in turns.
        duration: u32,
    },
}

/// An immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spell {
    /// Stable id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Spell level; 0 for cantrips, which cost no slot.
    pub level: u8,
    /// Target mode.
    pub target: SpellTarget,
    /// Effect shape.
    pub effect: SpellEffect,
    /// Optional eligibility predicate on the target.
    pub requirement: Option<TargetRequirement>,
}

impl Spell {
    /// Whether the spell is aimed at the enemy.
    #[must_use]
    pub fn is_offensive(&self) -> bool {
        self.target == SpellTarget::Enemy
    }

    /// Slot spent to cast the spell, if any.
    #[must_use]
    pub fn slot(&self) -> Option<ResourceRef> {
        (self.level > 0).then_some(ResourceRef::SpellSlot(self.level))
    }
}

const fn armor_buff(armor_class: i32) -> ConditionModifiers {
    ConditionModifiers {
        attack: 0,
        damage: 0,
        armor_class,
        spell_attack: 0,
        spell_dc: 0,
        fortitude: 0,
        reflex: 0,
        will: 0,
        prevents_actions: false,
        prevents_spellcasting: false,
        periodic_damage: None,
    }
}

const CATALOG: &[Spell] = &[
    Spell {
        id: "ray_of_frost",
        name: "Ray of Frost",
        level: 0,
        target: SpellTarget::Enemy,
        effect: SpellEffect::AttackRoll {
            damage: DiceExpression::plain(1, 3, 0),
            damage_type: DamageType::Cold,
        },
        requirement: None,
    },
    Spell {
        id: "shocking_grasp",
        name: "Shocking Grasp",
        level: 1,
        target: SpellTarget::Enemy,
        effect: SpellEffect::AttackRoll {
            damage: DiceExpression::plain(2, 6, 0),
            damage_type: DamageType::Electricity,
        },
        requirement: None,
    },
    Spell {
        id: "scorching_ray",
        name: "Scorching Ray",
        level: 2,
        target: SpellTarget::Enemy,
        effect: SpellEffect::AttackRoll {
            damage: DiceExpression::plain(4, 6, 0),
            damage_type: DamageType::Fire,
        },
        requirement: None,
    },
    Spell {
        id: "burning_hands",
        name: "Burning Hands",
        level: 1,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Reflex,
            on_success: SaveEffect::Half,
            damage: Some((DiceExpression::plain(2, 4, 0), DamageType::Fire)),
            condition: None,
        },
        requirement: None,
    },
    Spell {
        id: "fireball",
        name: "Fireball",
        level: 3,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Reflex,
            on_success: SaveEffect::Half,
            damage: Some((DiceExpression::plain(6, 6, 0), DamageType::Fire)),
            condition: Some(ConditionType::Burning),
        },
        requirement: None,
    },
    Spell {
        id: "sleep",
        name: "Sleep",
        level: 1,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Will,
            on_success: SaveEffect::Negates,
            damage: None,
            condition: Some(ConditionType::Asleep),
        },
        requirement: Some(TargetRequirement::MaxHp(5)),
    },
    Spell {
        id: "hold_person",
        name: "Hold Person",
        level: 2,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Will,
            on_success: SaveEffect::Negates,
            damage: None,
            condition: Some(ConditionType::Paralyzed),
        },
        requirement: None,
    },
    Spell {
        id: "cause_fear",
        name: "Cause Fear",
        level: 1,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Will,
            on_success: SaveEffect::Negates,
            damage: None,
            condition: Some(ConditionType::Frightened),
        },
        requirement: None,
    },
    Spell {
        id: "inflict_light_wounds",
        name: "Inflict Light Wounds",
        level: 1,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Will,
            on_success: SaveEffect::Half,
            damage: Some((DiceExpression::plain(1, 8, 1), DamageType::Negative)),
            condition: None,
        },
        requirement: None,
    },
    Spell {
        id: "sound_burst",
        name: "Sound Burst",
        level: 2,
        target: SpellTarget::Enemy,
        effect: SpellEffect::SavingThrow {
            save: SaveType::Fortitude,
            on_success: SaveEffect::Negates,
            damage: Some((DiceExpression::plain(1, 8, 0), DamageType::Sonic)),
            condition: Some(ConditionType::Stunned),
        },
        requirement: None,
    },
    Spell {
        id: "bless",
        name: "Bless",
        level: 1,
        target: SpellTarget::Caster,
        effect: SpellEffect::Buff {
            condition: ConditionType::Blessed,
            modifiers: ConditionModifiers {
                attack: 1,
                will: 1,
                ..armor_buff(0)
            },
            duration: 5,
        },
        requirement: None,
    },
    Spell {
        id: "divine_favor",
        name: "Divine Favor",
        level: 1,
        target: SpellTarget::Caster,
        effect: SpellEffect::Buff {
            condition: ConditionType::Inspired,
            modifiers: ConditionModifiers {
                attack: 1,
                damage: 1,
                ..armor_buff(0)
            },
            duration: 3,
        },
        requirement: None,
    },
    Spell {
        id: "shield",
        name: "Shield",
        level: 1,
        target: SpellTarget::Caster,
        effect: SpellEffect::Buff {
            condition: ConditionType::Shielded,
            modifiers: armor_buff(4),
            duration: 5,
        },
        requirement: None,
    },
    Spell {
        id: "mage_armor",
        name: "Mage Armor",
        level: 1,
        target: SpellTarget::Caster,
        effect: SpellEffect::Buff {
            condition: ConditionType::MageArmored,
            modifiers: armor_buff(4),
            duration: 10,
        },
        requirement: None,
    },
];

/// Looks up a spell by id.
#[must_use]
pub fn spell(id: &str) -> Option<&'static Spell> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Every catalog entry.
#[must_use]
pub fn catalog() -> &'static [Spell] {
    CATALOG
}

/// Why a spell could not be cast at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpellError {
    /// No such spell in the catalog.
    #[error("spell not found: {0}")]
    SpellNotFound(String),
    /// The caster does not know the spell.
    #[error("spell not known: {0}")]
    SpellNotKnown(String),
    /// The caster cannot cast right now.
    #[error("cannot cast spells while {0}")]
    Prevented(String),
    /// No slot of the spell's level is left.
    #[error(transparent)]
    InsufficientResource(#[from] ResourceFailure),
}

/// What a cast produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SpellOutcome {
    /// A self buff for the caller to register.
    Buff {
        /// Condition to register on the caster.
        condition: ConditionType,
        /// Magnitude to register it with.
        modifiers: ConditionModifiers,
        /// Duration in turns.
        duration: u32,
    },
    /// A spell attack that connected.
    Hit {
        /// The attack roll.
        attack: AttackRollResult,
        /// Damage dealt.
        damage: i32,
        /// Damage type.
        damage_type: DamageType,
    },
    /// A spell attack that missed.
    Miss {
        /// The attack roll.
        attack: AttackRollResult,
    },
    /// A saving-throw spell resolved.
    Save {
        /// The target's save.
        save: SavingThrowResult,
        /// Damage dealt after save semantics.
        damage: i32,
        /// Damage type, if the spell deals damage.
        damage_type: Option<DamageType>,
        /// Condition to apply to the target.
        condition: Option<ConditionType>,
    },
    /// The target was not eligible; no save was rolled.
    RequirementsNotMet {
        /// Why the target was ineligible.
        reason: String,
    },
}

/// A resolved cast.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellCast<C> {
    /// The caster after spending the slot.
    pub caster: C,
    /// The outcome.
    pub outcome: SpellOutcome,
    /// Narrated log line.
    pub message: String,
}

/// Inputs to [`cast_spell`] besides the two combatants.
pub struct CastContext<'a> {
    /// Caster's live conditions.
    pub caster_conditions: &'a [Condition],
    /// Target's live conditions.
    pub target_conditions: &'a [Condition],
    /// Natural d20 to use instead of rolling (attack roll or save).
    pub forced_d20: Option<u32>,
    /// Outcome source.
    pub rng: &'a mut dyn DeterministicRng,
}

/// Casts `spell_id` from `caster` at `target`.
///
/// The slot is spent only when the spell actually goes off; an ineligible
/// target returns [`SpellOutcome::RequirementsNotMet`] without spending it.
///
/// # Errors
///
/// [`SpellError::SpellNotFound`], [`SpellError::SpellNotKnown`],
/// [`SpellError::Prevented`] when a condition forbids casting, and
/// [`SpellError::InsufficientResource`] when no slot is left.
#[allow(clippy::cast_possible_wrap)]
pub fn cast_spell<C: StatBlock, T: StatBlock>(
    caster: &C,
    target: &T,
    spell_id: &str,
    ctx: CastContext<'_>,
) -> Result<SpellCast<C>, SpellError> {
    let CastContext {
        caster_conditions,
        target_conditions,
        forced_d20,
        rng,
    } = ctx;
    let found = spell(spell_id).ok_or_else(|| SpellError::SpellNotFound(spell_id.to_owned()))?;
    if !caster.knows_spell(spell_id) {
        return Err(SpellError::SpellNotKnown(spell_id.to_owned()));
    }
    let caster_mods = aggregate(caster_conditions);
    if caster_mods.prevents_spellcasting {
        return Err(SpellError::Prevented("incapacitated".to_owned()));
    }

    if let (Some(TargetRequirement::MaxHp(max)), SpellTarget::Enemy) =
        (found.requirement, found.target)
    {
        if target.hp() > max {
            let reason = format!("{} is too strong to be affected", target.name());
            return Ok(SpellCast {
                caster: caster.clone(),
                message: format!("{} fails: {reason}.", found.name),
                outcome: SpellOutcome::RequirementsNotMet { reason },
            });
        }
    }

    let caster = match found.slot() {
        Some(slot) => resources::consume(caster, &slot)?,
        None => caster.clone(),
    };

    let (outcome, message) = match found.effect {
        SpellEffect::Buff {
            condition,
            modifiers,
            duration,
        } => {
            let magnitude = describe_magnitude(&modifiers);
            (
                SpellOutcome::Buff {
                    condition,
                    modifiers,
                    duration,
                },
                format!(
                    "{} casts {} ({magnitude} for {duration} turns).",
                    caster.name(),
                    found.name
                ),
            )
        }
        SpellEffect::AttackRoll {
            damage,
            damage_type,
        } => {
            let natural = forced_d20.unwrap_or_else(|| rng.next_u32_range(1, 20));
            let bonus = caster.base_attack_bonus()
                + casting_ability_modifier(&caster)
                + caster_mods.spell_attack;
            let target_ac =
                checks::armor_class(target) + aggregate(target_conditions).armor_class;
            let attack = resolve_attack_roll(natural, bonus, target_ac);
            if attack.hit {
                let multiplier = if attack.critical { 2 } else { 1 };
                let dealt = damage.roll_with_dice_multiplier(rng, multiplier).max(1);
                let crit = if attack.critical { " Critical!" } else { "" };
                (
                    SpellOutcome::Hit {
                        attack,
                        damage: dealt,
                        damage_type,
                    },
                    format!(
                        "{} hits {} with {} for {dealt} {} damage.{crit}",
                        caster.name(),
                        target.name(),
                        found.name,
                        damage_type.label()
                    ),
                )
            } else {
                (
                    SpellOutcome::Miss { attack },
                    format!("{}'s {} misses {}.", caster.name(), found.name, target.name()),
                )
            }
        }
        SpellEffect::SavingThrow {
            save,
            on_success,
            damage,
            condition,
        } => {
            let dc = spell_save_dc(&caster, found.level) + caster_mods.spell_dc;
            let target_mods = aggregate(target_conditions);
            let result = checks::saving_throw(
                target,
                save,
                dc,
                target_mods.save(save),
                rng,
                forced_d20,
            );
            let rolled = damage.map(|(dice, _)| dice.roll(rng).max(1));
            let (dealt, applied) = match (result.success, on_success) {
                (true, SaveEffect::Negates) => (0, None),
                (true, SaveEffect::Half) => (rolled.map_or(0, |d| d / 2), None),
                (false, _) => (rolled.unwrap_or(0), condition),
            };
            let verdict = if result.success { "resists" } else { "succumbs to" };
            (
                SpellOutcome::Save {
                    save: result,
                    damage: dealt,
                    damage_type: damage.map(|(_, kind)| kind),
                    condition: applied,
                },
                format!(
                    "{} {verdict} {} (save {} vs DC {dc}){}.",
                    target.name(),
                    found.name,
                    result.total,
                    describe_save_effect(dealt, applied)
                ),
            )
        }
    };

    tracing::debug!(caster = caster.name(), spell = spell_id, ?outcome, "spell cast");
    Ok(SpellCast {
        caster,
        outcome,
        message,
    })
}

fn describe_magnitude(modifiers: &ConditionModifiers) -> String {
    let mut parts = Vec::new();
    for (value, label) in [
        (modifiers.attack, "attack"),
        (modifiers.damage, "damage"),
        (modifiers.armor_class, "AC"),
        (modifiers.will, "Will"),
    ] {
        if value != 0 {
            parts.push(format!("{value:+} {label}"));
        }
    }
    parts.join(", ")
}

fn describe_save_effect(damage: i32, condition: Option<ConditionType>) -> String {
    match (damage, condition) {
        (0, None) => String::new(),
        (0, Some(c)) => format!(" and is {}", c.display_name()),
        (d, None) => format!(", taking {d} damage"),
        (d, Some(c)) => format!(", taking {d} damage and is {}", c.display_name()),
    }
}
