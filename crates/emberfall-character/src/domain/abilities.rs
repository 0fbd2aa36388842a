//! The six ability scores.

use emberfall_core::dice::ability_modifier;
use serde::{Deserialize, Serialize};

/// One of the six core abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ability {
    /// Melee attack and damage.
    Strength,
    /// Initiative, armor class, finesse attacks, Reflex saves.
    Dexterity,
    /// Hit points and Fortitude saves.
    Constitution,
    /// Arcane casting.
    Intelligence,
    /// Divine casting and Will saves.
    Wisdom,
    /// Social skills.
    Charisma,
}

impl Ability {
    /// All abilities in sheet order.
    pub const ALL: [Self; 6] = [
        Self::Strength,
        Self::Dexterity,
        Self::Constitution,
        Self::Intelligence,
        Self::Wisdom,
        Self::Charisma,
    ];

    /// Three-letter abbreviation used in log lines.
    #[must_use]
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Strength => "STR",
            Self::Dexterity => "DEX",
            Self::Constitution => "CON",
            Self::Intelligence => "INT",
            Self::Wisdom => "WIS",
            Self::Charisma => "CHA",
        }
    }
}

/// A full set of ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScores {
    /// Strength score.
    pub strength: i32,
    /// Dexterity score.
    pub dexterity: i32,
    /// Constitution score.
    pub constitution: i32,
    /// Intelligence score.
    pub intelligence: i32,
    /// Wisdom score.
    pub wisdom: i32,
    /// Charisma score.
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

impl AbilityScores {
    /// Builds a score set in STR, DEX, CON, INT, WIS, CHA order.
    #[must_use]
    pub const fn new(
        strength: i32,
        dexterity: i32,
        constitution: i32,
        intelligence: i32,
        wisdom: i32,
        charisma: i32,
    ) -> Self {
        Self {
            strength,
            dexterity,
            constitution,
            intelligence,
            wisdom,
            charisma,
        }
    }

    /// Returns the raw score for `ability`.
    #[must_use]
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// Returns the modifier for `ability`.
    #[must_use]
    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }

    /// Returns a copy with `ability` set to `value`.
    #[must_use]
    pub fn with_score(&self, ability: Ability, value: i32) -> Self {
        let mut next = *self;
        match ability {
            Ability::Strength => next.strength = value,
            Ability::Dexterity => next.dexterity = value,
            Ability::Constitution => next.constitution = value,
            Ability::Intelligence => next.intelligence = value,
            Ability::Wisdom => next.wisdom = value,
            Ability::Charisma => next.charisma = value,
        }
        next
    }

    /// Highest modifier among `candidates`.
    #[must_use]
    pub fn best_modifier(&self, candidates: &[Ability]) -> i32 {
        candidates
            .iter()
            .map(|ability| self.modifier(*ability))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_reads_matching_score() {
        let scores = AbilityScores::new(16, 14, 12, 9, 8, 1);

        assert_eq!(scores.modifier(Ability::Strength), 3);
        assert_eq!(scores.modifier(Ability::Dexterity), 2);
        assert_eq!(scores.modifier(Ability::Constitution), 1);
        assert_eq!(scores.modifier(Ability::Intelligence), -1);
        assert_eq!(scores.modifier(Ability::Wisdom), -1);
        assert_eq!(scores.modifier(Ability::Charisma), -5);
    }

    #[test]
    fn test_with_score_leaves_original_untouched() {
        let scores = AbilityScores::default();
        let raised = scores.with_score(Ability::Wisdom, 18);

        assert_eq!(scores.wisdom, 10);
        assert_eq!(raised.wisdom, 18);
    }

    #[test]
    fn test_best_modifier_picks_highest() {
        let scores = AbilityScores::new(10, 10, 10, 12, 17, 14);

        assert_eq!(
            scores.best_modifier(&[Ability::Intelligence, Ability::Wisdom, Ability::Charisma]),
            3
        );
    }
}
