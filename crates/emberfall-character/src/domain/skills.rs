//! Skill table.

use serde::{Deserialize, Serialize};

use super::abilities::Ability;

/// A trained skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skill {
    /// Climbing, swimming, forcing doors.
    Athletics,
    /// Tumbling and balance.
    Acrobatics,
    /// Moving unseen.
    Stealth,
    /// Noticing things.
    Perception,
    /// Reading intent.
    SenseMotive,
    /// Tracking and foraging.
    Survival,
    /// First aid.
    Heal,
    /// Arcane lore.
    Arcana,
    /// Divine lore.
    Religion,
    /// Persuasion.
    Diplomacy,
    /// Threats.
    Intimidate,
    /// Lies and disguises.
    Deception,
}

impl Skill {
    /// Every skill.
    pub const ALL: [Self; 12] = [
        Self::Athletics,
        Self::Acrobatics,
        Self::Stealth,
        Self::Perception,
        Self::SenseMotive,
        Self::Survival,
        Self::Heal,
        Self::Arcana,
        Self::Religion,
        Self::Diplomacy,
        Self::Intimidate,
        Self::Deception,
    ];

    /// The ability whose modifier is added to checks with this skill.
    #[must_use]
    pub fn governing_ability(self) -> Ability {
        match self {
            Self::Athletics => Ability::Strength,
            Self::Acrobatics | Self::Stealth => Ability::Dexterity,
            Self::Perception | Self::SenseMotive | Self::Survival | Self::Heal => Ability::Wisdom,
            Self::Arcana | Self::Religion => Ability::Intelligence,
            Self::Diplomacy | Self::Intimidate | Self::Deception => Ability::Charisma,
        }
    }

    /// Display name for log lines.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Athletics => "Athletics",
            Self::Acrobatics => "Acrobatics",
            Self::Stealth => "Stealth",
            Self::Perception => "Perception",
            Self::SenseMotive => "Sense Motive",
            Self::Survival => "Survival",
            Self::Heal => "Heal",
            Self::Arcana => "Arcana",
            Self::Religion => "Religion",
            Self::Diplomacy => "Diplomacy",
            Self::Intimidate => "Intimidate",
            Self::Deception => "Deception",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_serializes_camel_case() {
        let json = serde_json::to_string(&Skill::SenseMotive).unwrap();
        assert_eq!(json, "\"senseMotive\"");
    }

    #[test]
    fn test_governing_abilities() {
        assert_eq!(Skill::Athletics.governing_ability(), Ability::Strength);
        assert_eq!(Skill::Stealth.governing_ability(), Ability::Dexterity);
        assert_eq!(Skill::Perception.governing_ability(), Ability::Wisdom);
        assert_eq!(Skill::Arcana.governing_ability(), Ability::Intelligence);
        assert_eq!(Skill::Intimidate.governing_ability(), Ability::Charisma);
    }
}
