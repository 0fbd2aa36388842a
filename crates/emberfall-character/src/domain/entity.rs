//! The shared stat block and its two concrete holders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::abilities::{Ability, AbilityScores};
use super::classes::CharacterClass;
use super::equipment::Equipment;
use super::resources::ResourceLedger;
use super::skills::Skill;

/// One of the three saving throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveType {
    /// Resists poison, disease, physical effects.
    Fortitude,
    /// Resists area blasts.
    Reflex,
    /// Resists mind-affecting magic.
    Will,
}

impl SaveType {
    /// The ability added to this save.
    #[must_use]
    pub fn ability(self) -> Ability {
        match self {
            Self::Fortitude => Ability::Constitution,
            Self::Reflex => Ability::Dexterity,
            Self::Will => Ability::Wisdom,
        }
    }
}

/// Base save bonuses before ability modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBonuses {
    /// Base Fortitude.
    pub fortitude: i32,
    /// Base Reflex.
    pub reflex: i32,
    /// Base Will.
    pub will: i32,
}

impl SaveBonuses {
    /// Returns the base bonus for `save`.
    #[must_use]
    pub fn get(&self, save: SaveType) -> i32 {
        match save {
            SaveType::Fortitude => self.fortitude,
            SaveType::Reflex => self.reflex,
            SaveType::Will => self.will,
        }
    }

    /// Computes class base saves at `level`.
    #[must_use]
    pub fn for_class(class: CharacterClass, level: u32) -> Self {
        Self {
            fortitude: class.base_save(SaveType::Fortitude, level),
            reflex: class.base_save(SaveType::Reflex, level),
            will: class.base_save(SaveType::Will, level),
        }
    }
}

/// Read access to combat-relevant statistics plus the pure transforms the
/// rules engine needs.
///
/// Implemented by [`Character`] and [`Creature`] so rules code is written
/// once for both.
pub trait StatBlock: Clone {
    /// Display name.
    fn name(&self) -> &str;
    /// Character or creature level.
    fn level(&self) -> u32;
    /// Ability scores.
    fn abilities(&self) -> &AbilityScores;
    /// Current hit points.
    fn hp(&self) -> i32;
    /// Maximum hit points.
    fn max_hp(&self) -> i32;
    /// Base attack bonus.
    fn base_attack_bonus(&self) -> i32;
    /// Base save bonuses.
    fn base_saves(&self) -> SaveBonuses;
    /// Ranks invested in `skill`.
    fn skill_ranks(&self, skill: Skill) -> u32;
    /// Owned feat ids.
    fn feats(&self) -> &[String];
    /// Known spell ids.
    fn spells_known(&self) -> &[String];
    /// Carried equipment.
    fn equipment(&self) -> &Equipment;
    /// Limited abilities and spell slots.
    fn resources(&self) -> &ResourceLedger;
    /// Class, for player characters.
    fn class(&self) -> Option<CharacterClass>;
    /// Returns a copy with `hp`, clamped to `0..=max_hp`.
    #[must_use]
    fn with_hp(&self, hp: i32) -> Self;
    /// Returns a copy with a replaced ledger.
    #[must_use]
    fn with_resources(&self, resources: ResourceLedger) -> Self;
    /// Returns a copy with a replaced equipment set.
    #[must_use]
    fn with_equipment(&self, equipment: Equipment) -> Self;

    /// Natural armor bonus to AC.
    fn natural_armor(&self) -> i32 {
        0
    }

    /// Whether `skill` earns the class-skill bonus.
    fn is_class_skill(&self, skill: Skill) -> bool {
        self.class()
            .is_some_and(|class| class.class_skills().contains(&skill))
    }

    /// Whether the feat is owned.
    fn has_feat(&self, feat_id: &str) -> bool {
        self.feats().iter().any(|f| f == feat_id)
    }

    /// Whether the spell is known.
    fn knows_spell(&self, spell_id: &str) -> bool {
        self.spells_known().iter().any(|s| s == spell_id)
    }

    /// Modifier for `ability`.
    fn modifier(&self, ability: Ability) -> i32 {
        self.abilities().modifier(ability)
    }

    /// Whether hit points have reached zero.
    fn is_defeated(&self) -> bool {
        self.hp() <= 0
    }

    /// Returns a copy with `amount` damage taken.
    #[must_use]
    fn take_damage(&self, amount: i32) -> Self {
        self.with_hp(self.hp() - amount.max(0))
    }

    /// Returns a copy healed by `amount`, capped at max HP.
    #[must_use]
    fn heal(&self, amount: i32) -> Self {
        self.with_hp(self.hp() + amount.max(0))
    }
}

/// A player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Display name.
    pub name: String,
    /// Class.
    pub class: CharacterClass,
    /// Level, 1 and up.
    pub level: u32,
    /// Experience points.
    #[serde(default)]
    pub experience: u32,
    /// Ability scores.
    pub abilities: AbilityScores,
    /// Current hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Base attack bonus.
    pub base_attack_bonus: i32,
    /// Base saves.
    pub saves: SaveBonuses,
    /// Ranks per skill; absent skills have zero ranks.
    #[serde(default)]
    pub skill_ranks: BTreeMap<Skill, u32>,
    /// Owned feats.
    #[serde(default)]
    pub feats: Vec<String>,
    /// Known spells.
    #[serde(default)]
    pub spells_known: Vec<String>,
    /// Equipment.
    #[serde(default)]
    pub equipment: Equipment,
    /// Resource ledger.
    #[serde(default)]
    pub resources: ResourceLedger,
}

impl StatBlock for Character {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn abilities(&self) -> &AbilityScores {
        &self.abilities
    }

    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn base_attack_bonus(&self) -> i32 {
        self.base_attack_bonus
    }

    fn base_saves(&self) -> SaveBonuses {
        self.saves
    }

    fn skill_ranks(&self, skill: Skill) -> u32 {
        self.skill_ranks.get(&skill).copied().unwrap_or(0)
    }

    fn feats(&self) -> &[String] {
        &self.feats
    }

    fn spells_known(&self) -> &[String] {
        &self.spells_known
    }

    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn resources(&self) -> &ResourceLedger {
        &self.resources
    }

    fn class(&self) -> Option<CharacterClass> {
        Some(self.class)
    }

    fn with_hp(&self, hp: i32) -> Self {
        Self {
            hp: hp.clamp(0, self.max_hp),
            ..self.clone()
        }
    }

    fn with_resources(&self, resources: ResourceLedger) -> Self {
        Self {
            resources,
            ..self.clone()
        }
    }

    fn with_equipment(&self, equipment: Equipment) -> Self {
        Self {
            equipment,
            ..self.clone()
        }
    }
}

/// A non-player opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    /// Bestiary id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Challenge level.
    pub level: u32,
    /// Ability scores.
    pub abilities: AbilityScores,
    /// Current hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Natural armor bonus.
    #[serde(default)]
    pub natural_armor: i32,
    /// Base attack bonus.
    pub base_attack_bonus: i32,
    /// Base saves.
    #[serde(default)]
    pub saves: SaveBonuses,
    /// Ranks per skill.
    #[serde(default)]
    pub skill_ranks: BTreeMap<Skill, u32>,
    /// Feats, used in order by the enemy turn policy.
    #[serde(default)]
    pub feats: Vec<String>,
    /// Spells, used in order by the enemy turn policy.
    #[serde(default)]
    pub spells_known: Vec<String>,
    /// Equipment; the weapon doubles as the natural attack.
    #[serde(default)]
    pub equipment: Equipment,
    /// Resource ledger.
    #[serde(default)]
    pub resources: ResourceLedger,
    /// Experience granted on defeat.
    #[serde(default)]
    pub xp_reward: u32,
    /// Gold granted on defeat.
    #[serde(default)]
    pub gold_reward: u32,
}

impl StatBlock for Creature {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn abilities(&self) -> &AbilityScores {
        &self.abilities
    }

    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn base_attack_bonus(&self) -> i32 {
        self.base_attack_bonus
    }

    fn base_saves(&self) -> SaveBonuses {
        self.saves
    }

    fn skill_ranks(&self, skill: Skill) -> u32 {
        self.skill_ranks.get(&skill).copied().unwrap_or(0)
    }

    fn feats(&self) -> &[String] {
        &self.feats
    }

    fn spells_known(&self) -> &[String] {
        &self.spells_known
    }

    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn resources(&self) -> &ResourceLedger {
        &self.resources
    }

    fn class(&self) -> Option<CharacterClass> {
        None
    }

    fn with_hp(&self, hp: i32) -> Self {
        Self {
            hp: hp.clamp(0, self.max_hp),
            ..self.clone()
        }
    }

    fn with_resources(&self, resources: ResourceLedger) -> Self {
        Self {
            resources,
            ..self.clone()
        }
    }

    fn with_equipment(&self, equipment: Equipment) -> Self {
        Self {
            equipment,
            ..self.clone()
        }
    }

    fn natural_armor(&self) -> i32 {
        self.natural_armor
    }
}
