//! Class tables: hit dice, attack and save progressions, class skills,
//! spell slots and starting kits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::abilities::{Ability, AbilityScores};
use super::entity::SaveType;
use super::equipment::{Armor, DamageType, Equipment, Shield, Weapon};
use super::resources::{LimitedAbility, UsageKind};
use super::skills::Skill;

/// Highest spell level any class can cast.
pub const MAX_SPELL_LEVEL: u8 = 5;

/// Source of a class's spellcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CasterTradition {
    /// Intelligence-based casting.
    Arcane,
    /// Wisdom-based casting.
    Divine,
}

impl CasterTradition {
    /// The ability that drives spell attacks and save DCs.
    #[must_use]
    pub fn casting_ability(self) -> Ability {
        match self {
            Self::Arcane => Ability::Intelligence,
            Self::Divine => Ability::Wisdom,
        }
    }
}

/// A playable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacterClass {
    /// Full attack progression, d10 hit die.
    Fighter,
    /// Skills and sneak attacks, d8 hit die.
    Rogue,
    /// Arcane caster, d6 hit die.
    Wizard,
    /// Divine caster, d8 hit die.
    Cleric,
}

enum AttackProgression {
    Full,
    ThreeQuarters,
    Half,
}

impl CharacterClass {
    /// Faces on the class hit die.
    #[must_use]
    pub fn hit_die(self) -> u32 {
        match self {
            Self::Fighter => 10,
            Self::Rogue | Self::Cleric => 8,
            Self::Wizard => 6,
        }
    }

    /// Average hit-die roll used for level-up HP: `sides / 2 + 1`.
    #[must_use]
    pub fn average_hit_die(self) -> i32 {
        i32::try_from(self.hit_die() / 2 + 1).unwrap_or(1)
    }

    /// Base attack bonus at `level`.
    #[must_use]
    pub fn base_attack_bonus(self, level: u32) -> i32 {
        let bab = match self.attack_progression() {
            AttackProgression::Full => level,
            AttackProgression::ThreeQuarters => level * 3 / 4,
            AttackProgression::Half => level / 2,
        };
        i32::try_from(bab).unwrap_or(i32::MAX)
    }

    /// Base save bonus for `save` at `level`.
    #[must_use]
    pub fn base_save(self, save: SaveType, level: u32) -> i32 {
        let bonus = if self.good_saves().contains(&save) {
            2 + level / 2
        } else {
            level / 3
        };
        i32::try_from(bonus).unwrap_or(i32::MAX)
    }

    /// Saves that use the good progression.
    #[must_use]
    pub fn good_saves(self) -> &'static [SaveType] {
        match self {
            Self::Fighter => &[SaveType::Fortitude],
            Self::Rogue => &[SaveType::Reflex],
            Self::Wizard => &[SaveType::Will],
            Self::Cleric => &[SaveType::Fortitude, SaveType::Will],
        }
    }

    /// Skills that earn the class-skill bonus.
    #[must_use]
    pub fn class_skills(self) -> &'static [Skill] {
        match self {
            Self::Fighter => &[Skill::Athletics, Skill::Intimidate, Skill::Survival],
            Self::Rogue => &[
                Skill::Acrobatics,
                Skill::Stealth,
                Skill::Perception,
                Skill::SenseMotive,
                Skill::Deception,
                Skill::Diplomacy,
            ],
            Self::Wizard => &[Skill::Arcana, Skill::Perception],
            Self::Cleric => &[Skill::Religion, Skill::Heal, Skill::Diplomacy, Skill::SenseMotive],
        }
    }

    /// The class's casting tradition, if it casts at all.
    #[must_use]
    pub fn caster_tradition(self) -> Option<CasterTradition> {
        match self {
            Self::Wizard => Some(CasterTradition::Arcane),
            Self::Cleric => Some(CasterTradition::Divine),
            Self::Fighter | Self::Rogue => None,
        }
    }

    /// Highest spell level castable at `level`, if any.
    ///
    /// Spell level `n` unlocks at caster level `2n - 1`.
    #[must_use]
    pub fn max_spell_level(self, level: u32) -> Option<u8> {
        self.caster_tradition()?;
        let max = u8::try_from(level.div_ceil(2)).unwrap_or(MAX_SPELL_LEVEL);
        Some(max.min(MAX_SPELL_LEVEL))
    }

    /// Spell-slot maxima at `level`, keyed by spell level.
    ///
    /// A spell level opens with two slots and gains one more every two
    /// caster levels, up to four.
    #[must_use]
    pub fn spell_slots(self, level: u32) -> BTreeMap<u8, u32> {
        let mut slots = BTreeMap::new();
        let Some(max) = self.max_spell_level(level) else {
            return slots;
        };
        for spell_level in 1..=max {
            let unlocked_at = u32::from(spell_level) * 2 - 1;
            if level >= unlocked_at {
                slots.insert(spell_level, (2 + (level - unlocked_at) / 2).min(4));
            }
        }
        slots
    }

    /// Spells added to the known list on reaching `level`.
    #[must_use]
    pub fn spells_gained_at(self, level: u32) -> &'static [&'static str] {
        match (self, level) {
            (Self::Wizard, 1) => &[
                "ray_of_frost",
                "shocking_grasp",
                "burning_hands",
                "sleep",
                "shield",
                "mage_armor",
            ],
            (Self::Wizard, 3) => &["scorching_ray"],
            (Self::Wizard, 5) => &["fireball"],
            (Self::Cleric, 1) => &["inflict_light_wounds", "cause_fear", "bless", "divine_favor"],
            (Self::Cleric, 3) => &["hold_person", "sound_burst"],
            _ => &[],
        }
    }

    /// Feats every member of the class starts with.
    #[must_use]
    pub fn starting_feats(self) -> &'static [&'static str] {
        match self {
            Self::Fighter => &["power_attack", "weapon_focus", "battle_rage"],
            Self::Rogue => &["weapon_finesse", "sneak_attack", "poisoned_blade"],
            Self::Wizard => &["iron_will"],
            Self::Cleric => &["prayer_of_valor"],
        }
    }

    /// Limited abilities granted at level 1.
    #[must_use]
    pub fn starting_abilities(self) -> Vec<LimitedAbility> {
        match self {
            Self::Fighter => vec![LimitedAbility::new("battle_rage", UsageKind::Daily, 1)],
            Self::Rogue => vec![LimitedAbility::new("poison_vial", UsageKind::Encounter, 2)],
            Self::Wizard => vec![],
            Self::Cleric => vec![LimitedAbility::new("channel_energy", UsageKind::Daily, 3)],
        }
    }

    /// Starting weapon, armor and pack.
    #[must_use]
    pub fn starting_equipment(self) -> Equipment {
        let potions = vec!["healing_potion".to_owned(), "healing_potion".to_owned()];
        match self {
            Self::Fighter => Equipment {
                weapon: Some(Weapon::new("longsword", "Longsword", "1d8", DamageType::Slashing)),
                armor: Some(armor("chainmail", "Chainmail", 5, Some(2))),
                shield: Some(Shield {
                    id: "heavy_shield".to_owned(),
                    name: "Heavy shield".to_owned(),
                    shield_bonus: 2,
                }),
                items: potions,
            },
            Self::Rogue => Equipment {
                weapon: Some(
                    Weapon::new("short_sword", "Short sword", "1d6", DamageType::Piercing).finesse(),
                ),
                armor: Some(armor("leather", "Leather armor", 2, Some(6))),
                shield: None,
                items: potions,
            },
            Self::Wizard => Equipment {
                weapon: Some(Weapon::new(
                    "quarterstaff",
                    "Quarterstaff",
                    "1d6",
                    DamageType::Bludgeoning,
                )),
                armor: None,
                shield: None,
                items: potions,
            },
            Self::Cleric => Equipment {
                weapon: Some(Weapon::new("mace", "Heavy mace", "1d8", DamageType::Bludgeoning)),
                armor: Some(armor("scale_mail", "Scale mail", 4, Some(3))),
                shield: Some(Shield {
                    id: "light_shield".to_owned(),
                    name: "Light shield".to_owned(),
                    shield_bonus: 1,
                }),
                items: potions,
            },
        }
    }

    /// Suggested ability array for quick-start characters.
    #[must_use]
    pub fn suggested_abilities(self) -> AbilityScores {
        match self {
            Self::Fighter => AbilityScores::new(16, 13, 14, 10, 12, 8),
            Self::Rogue => AbilityScores::new(10, 16, 12, 13, 12, 10),
            Self::Wizard => AbilityScores::new(8, 14, 12, 16, 12, 10),
            Self::Cleric => AbilityScores::new(12, 10, 14, 10, 16, 12),
        }
    }

    /// Display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fighter => "Fighter",
            Self::Rogue => "Rogue",
            Self::Wizard => "Wizard",
            Self::Cleric => "Cleric",
        }
    }

    fn attack_progression(self) -> AttackProgression {
        match self {
            Self::Fighter => AttackProgression::Full,
            Self::Rogue | Self::Cleric => AttackProgression::ThreeQuarters,
            Self::Wizard => AttackProgression::Half,
        }
    }
}

fn armor(id: &str, name: &str, armor_bonus: i32, max_dex: Option<i32>) -> Armor {
    Armor {
        id: id.to_owned(),
        name: name.to_owned(),
        armor_bonus,
        max_dex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_progressions() {
        assert_eq!(CharacterClass::Fighter.base_attack_bonus(4), 4);
        assert_eq!(CharacterClass::Rogue.base_attack_bonus(4), 3);
        assert_eq!(CharacterClass::Cleric.base_attack_bonus(1), 0);
        assert_eq!(CharacterClass::Wizard.base_attack_bonus(5), 2);
    }

    #[test]
    fn test_good_and_poor_saves() {
        assert_eq!(CharacterClass::Fighter.base_save(SaveType::Fortitude, 1), 2);
        assert_eq!(CharacterClass::Fighter.base_save(SaveType::Will, 1), 0);
        assert_eq!(CharacterClass::Cleric.base_save(SaveType::Will, 4), 4);
        assert_eq!(CharacterClass::Rogue.base_save(SaveType::Fortitude, 6), 2);
    }

    #[test]
    fn test_spell_slots_open_at_odd_levels() {
        let at_one = CharacterClass::Wizard.spell_slots(1);
        let at_three = CharacterClass::Wizard.spell_slots(3);

        assert_eq!(at_one.get(&1), Some(&2));
        assert_eq!(at_one.get(&2), None);
        assert_eq!(at_three.get(&1), Some(&3));
        assert_eq!(at_three.get(&2), Some(&2));
        assert_eq!(CharacterClass::Wizard.spell_slots(10).get(&1), Some(&4));
    }

    #[test]
    fn test_martial_classes_have_no_slots() {
        assert!(CharacterClass::Fighter.spell_slots(9).is_empty());
        assert_eq!(CharacterClass::Rogue.max_spell_level(9), None);
    }

    #[test]
    fn test_average_hit_die() {
        assert_eq!(CharacterClass::Fighter.average_hit_die(), 6);
        assert_eq!(CharacterClass::Cleric.average_hit_die(), 5);
        assert_eq!(CharacterClass::Wizard.average_hit_die(), 4);
    }
}
