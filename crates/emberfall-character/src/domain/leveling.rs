//! Character creation and level advancement.

use std::collections::BTreeMap;

use super::abilities::{Ability, AbilityScores};
use super::classes::CharacterClass;
use super::entity::{Character, SaveBonuses};
use super::resources::ResourceLedger;

/// Level cap.
pub const MAX_LEVEL: u32 = 10;

/// Name given to the quick-start character.
pub const DEFAULT_CHARACTER_NAME: &str = "Wanderer";

/// Total experience needed to reach `level`.
#[must_use]
pub fn xp_for_level(level: u32) -> u32 {
    let level = level.max(1);
    1000 * (level - 1) * level / 2
}

impl Character {
    /// Builds a fresh level-1 character with the class starting kit.
    #[must_use]
    pub fn new(name: &str, class: CharacterClass, abilities: AbilityScores) -> Self {
        let con = abilities.modifier(Ability::Constitution);
        let hp = (i32::try_from(class.hit_die()).unwrap_or(1) + con).max(1);
        let resources = class
            .starting_abilities()
            .into_iter()
            .fold(ResourceLedger::default(), |ledger, ability| {
                ledger.with_ability(ability)
            })
            .with_slot_maxima(&class.spell_slots(1));

        Self {
            name: name.to_owned(),
            class,
            level: 1,
            experience: 0,
            abilities,
            hp,
            max_hp: hp,
            base_attack_bonus: class.base_attack_bonus(1),
            saves: SaveBonuses::for_class(class, 1),
            skill_ranks: class.class_skills().iter().map(|s| (*s, 1)).collect(),
            feats: class
                .starting_feats()
                .iter()
                .map(|f| (*f).to_owned())
                .collect(),
            spells_known: class
                .spells_gained_at(1)
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            equipment: class.starting_equipment(),
            resources,
        }
    }

    /// Hit points gained per level: average hit die plus CON modifier,
    /// at least 1.
    #[must_use]
    pub fn hp_per_level(&self) -> i32 {
        (self.class.average_hit_die() + self.abilities.modifier(Ability::Constitution)).max(1)
    }

    /// Advances one level, adding `chosen_feats`.
    ///
    /// Already-owned feats are ignored. A character at [`MAX_LEVEL`] is
    /// returned unchanged.
    #[must_use]
    pub fn level_up(&self, chosen_feats: &[String]) -> Self {
        if self.level >= MAX_LEVEL {
            return self.clone();
        }
        let level = self.level + 1;
        let gain = self.hp_per_level();

        let mut next = self.clone();
        next.level = level;
        next.max_hp += gain;
        next.hp = (next.hp + gain).min(next.max_hp);
        next.base_attack_bonus = self.class.base_attack_bonus(level);
        next.saves = SaveBonuses::for_class(self.class, level);
        for skill in self.class.class_skills() {
            *next.skill_ranks.entry(*skill).or_insert(0) += 1;
        }
        for feat in chosen_feats {
            if !next.feats.contains(feat) {
                next.feats.push(feat.clone());
            }
        }
        for spell in self.class.spells_gained_at(level) {
            if !next.spells_known.iter().any(|s| s == spell) {
                next.spells_known.push((*spell).to_owned());
            }
        }
        next.resources = next
            .resources
            .with_slot_maxima(&self.class.spell_slots(level));

        tracing::info!(
            character = %next.name,
            level,
            hp_gain = gain,
            bab = next.base_attack_bonus,
            "character levelled up"
        );
        next
    }

    /// Advances level by level until `target`, applying `chosen_feats` on
    /// the final step only.
    #[must_use]
    pub fn level_up_to(&self, target: u32, chosen_feats: &[String]) -> Self {
        let target = target.min(MAX_LEVEL);
        let mut current = self.clone();
        while current.level < target {
            let feats: &[String] = if current.level + 1 == target {
                chosen_feats
            } else {
                &[]
            };
            current = current.level_up(feats);
        }
        current
    }

    /// Returns a copy with `amount` experience added.
    #[must_use]
    pub fn gain_experience(&self, amount: u32) -> Self {
        Self {
            experience: self.experience.saturating_add(amount),
            ..self.clone()
        }
    }

    /// Whether enough experience has accrued for the next level.
    #[must_use]
    pub fn can_level_up(&self) -> bool {
        self.level < MAX_LEVEL && self.experience >= xp_for_level(self.level + 1)
    }

    /// Skill ranks in a form suitable for display.
    #[must_use]
    pub fn ranked_skills(&self) -> BTreeMap<String, u32> {
        self.skill_ranks
            .iter()
            .filter(|(_, ranks)| **ranks > 0)
            .map(|(skill, ranks)| (skill.display_name().to_owned(), *ranks))
            .collect()
    }
}

/// The quick-start Fighter used by `createDefaultCharacter`.
#[must_use]
pub fn default_character() -> Character {
    let class = CharacterClass::Fighter;
    Character::new(DEFAULT_CHARACTER_NAME, class, class.suggested_abilities())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::StatBlock;
    use crate::domain::resources::ResourceRef;
    use crate::domain::skills::Skill;

    #[test]
    fn test_new_fighter_starts_with_hit_die_plus_con() {
        let fighter = default_character();

        assert_eq!(fighter.level, 1);
        assert_eq!(fighter.max_hp, 12);
        assert_eq!(fighter.hp, 12);
        assert_eq!(fighter.base_attack_bonus, 1);
        assert_eq!(fighter.saves.fortitude, 2);
        assert!(fighter.has_feat("power_attack"));
    }

    #[test]
    fn test_fighter_con_14_level_two_gains_eight_hp_and_one_bab() {
        let fighter = default_character();
        assert_eq!(fighter.abilities.constitution, 14);

        let levelled = fighter.level_up(&[]);

        assert_eq!(levelled.level, 2);
        assert_eq!(levelled.max_hp - fighter.max_hp, 8);
        assert_eq!(levelled.hp - fighter.hp, 8);
        assert_eq!(levelled.base_attack_bonus - fighter.base_attack_bonus, 1);
    }

    #[test]
    fn test_level_up_does_not_mutate_input() {
        let fighter = default_character();
        let _ = fighter.level_up(&["improved_initiative".to_owned()]);

        assert_eq!(fighter.level, 1);
        assert!(!fighter.has_feat("improved_initiative"));
    }

    #[test]
    fn test_level_up_adds_chosen_feats_once() {
        let fighter = default_character();
        let feats = vec!["power_attack".to_owned(), "dodge".to_owned()];

        let levelled = fighter.level_up(&feats);

        assert_eq!(
            levelled.feats.iter().filter(|f| *f == "power_attack").count(),
            1
        );
        assert!(levelled.has_feat("dodge"));
    }

    #[test]
    fn test_wizard_gains_slots_and_spells() {
        let class = CharacterClass::Wizard;
        let wizard = Character::new("Ilse", class, class.suggested_abilities());
        assert_eq!(wizard.resources.remaining(&ResourceRef::SpellSlot(1)), Some(2));

        let third = wizard.level_up_to(3, &[]);

        assert_eq!(third.level, 3);
        assert_eq!(third.resources.remaining(&ResourceRef::SpellSlot(1)), Some(3));
        assert_eq!(third.resources.remaining(&ResourceRef::SpellSlot(2)), Some(2));
        assert!(third.knows_spell("scorching_ray"));
        assert_eq!(third.skill_ranks(Skill::Arcana), 3);
    }

    #[test]
    fn test_level_cap_is_respected() {
        let capped = default_character().level_up_to(50, &[]);
        assert_eq!(capped.level, MAX_LEVEL);
        assert_eq!(capped.level_up(&[]), capped);
    }

    #[test]
    fn test_experience_thresholds() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 1000);
        assert_eq!(xp_for_level(3), 3000);

        let fighter = default_character().gain_experience(999);
        assert!(!fighter.can_level_up());
        assert!(fighter.gain_experience(1).can_level_up());
    }
}
