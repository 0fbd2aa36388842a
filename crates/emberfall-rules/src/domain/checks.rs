//! Skill, save, armor class and initiative math.

use emberfall_character::domain::{Ability, SaveType, Skill, StatBlock};
use emberfall_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::feats::passive_bonuses;

/// Bonus for a skill that is both ranked and a class skill.
pub const CLASS_SKILL_BONUS: i32 = 3;

/// Acrobatics ranks that start adding to initiative.
pub const ACROBATICS_INITIATIVE_RANKS: u32 = 5;

/// Initiative bonus from trained Acrobatics.
pub const ACROBATICS_INITIATIVE_BONUS: i32 = 2;

/// Outcome of a saving throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingThrowResult {
    /// Which save was rolled.
    pub save: SaveType,
    /// Natural d20.
    pub roll: u32,
    /// Total bonus added.
    pub bonus: i32,
    /// `roll + bonus`.
    pub total: i32,
    /// Difficulty class.
    pub dc: i32,
    /// `total >= dc`.
    pub success: bool,
}

/// Outcome of a skill check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCheckResult {
    /// Which skill was rolled.
    pub skill: Skill,
    /// Natural d20.
    pub roll: u32,
    /// Skill bonus added.
    pub bonus: i32,
    /// `roll + bonus`.
    pub total: i32,
    /// Difficulty class.
    pub dc: i32,
    /// `total >= dc`.
    pub success: bool,
}

/// Ranks + governing ability modifier + class-skill bonus + `other`.
///
/// The class-skill bonus only applies when at least one rank is invested.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn skill_bonus<E: StatBlock>(entity: &E, skill: Skill, other: i32) -> i32 {
    let ranks = entity.skill_ranks(skill);
    let class_bonus = if ranks > 0 && entity.is_class_skill(skill) {
        CLASS_SKILL_BONUS
    } else {
        0
    };
    ranks as i32 + entity.modifier(skill.governing_ability()) + class_bonus + other
}

/// Base save + ability modifier + passive feat bonus.
#[must_use]
pub fn save_bonus<E: StatBlock>(entity: &E, save: SaveType) -> i32 {
    let passive = passive_bonuses(entity);
    let feat_bonus = match save {
        SaveType::Fortitude => passive.fortitude,
        SaveType::Reflex => passive.reflex,
        SaveType::Will => passive.will,
    };
    entity.base_saves().get(save) + entity.modifier(save.ability()) + feat_bonus
}

/// Rolls a saving throw. Ties succeed.
///
/// `situational` carries condition deltas; `forced` replaces the d20.
#[allow(clippy::cast_possible_wrap)]
pub fn saving_throw<E: StatBlock>(
    entity: &E,
    save: SaveType,
    dc: i32,
    situational: i32,
    rng: &mut dyn DeterministicRng,
    forced: Option<u32>,
) -> SavingThrowResult {
    let roll = forced.unwrap_or_else(|| rng.next_u32_range(1, 20));
    let bonus = save_bonus(entity, save) + situational;
    let total = roll as i32 + bonus;
    let result = SavingThrowResult {
        save,
        roll,
        bonus,
        total,
        dc,
        success: total >= dc,
    };
    tracing::debug!(entity = entity.name(), ?save, roll, total, dc, "saving throw");
    result
}

/// The modifier a caster adds to spell attacks and DCs.
///
/// Arcane classes use INT, divine classes WIS, and classless creatures
/// the best of INT, WIS and CHA. Non-casting classes get 0.
#[must_use]
pub fn casting_ability_modifier<E: StatBlock>(entity: &E) -> i32 {
    match entity.class() {
        Some(class) => class
            .caster_tradition()
            .map_or(0, |tradition| entity.modifier(tradition.casting_ability())),
        None => entity.abilities().best_modifier(&[
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]),
    }
}

/// `10 + spell level + casting modifier`.
#[must_use]
pub fn spell_save_dc<E: StatBlock>(caster: &E, spell_level: u8) -> i32 {
    10 + i32::from(spell_level) + casting_ability_modifier(caster)
}

/// Armor class before conditions.
///
/// `10 + armor + shield + DEX (capped by armor) + natural armor + passive
/// feat AC`.
#[must_use]
pub fn armor_class<E: StatBlock>(entity: &E) -> i32 {
    let equipment = entity.equipment();
    10 + equipment.armor_bonus()
        + equipment.shield_bonus()
        + equipment.capped_dex(entity.modifier(Ability::Dexterity))
        + entity.natural_armor()
        + passive_bonuses(entity).armor_class
}

/// Rolls `1d20 + skill bonus` against `dc`.
#[allow(clippy::cast_possible_wrap)]
pub fn skill_check<E: StatBlock>(
    entity: &E,
    skill: Skill,
    dc: i32,
    rng: &mut dyn DeterministicRng,
) -> SkillCheckResult {
    let roll = rng.next_u32_range(1, 20);
    let bonus = skill_bonus(entity, skill, 0);
    let total = roll as i32 + bonus;
    tracing::debug!(entity = entity.name(), ?skill, roll, total, dc, "skill check");
    SkillCheckResult {
        skill,
        roll,
        bonus,
        total,
        dc,
        success: total >= dc,
    }
}

/// DEX modifier + feat bonus + trained Acrobatics bonus.
#[must_use]
pub fn initiative_bonus<E: StatBlock>(entity: &E) -> i32 {
    let acrobatics = if entity.skill_ranks(Skill::Acrobatics) >= ACROBATICS_INITIATIVE_RANKS {
        ACROBATICS_INITIATIVE_BONUS
    } else {
        0
    };
    entity.modifier(Ability::Dexterity) + passive_bonuses(entity).initiative + acrobatics
}
