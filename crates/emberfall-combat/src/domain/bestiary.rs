//! Creature templates.

use std::collections::BTreeMap;

use emberfall_character::domain::{
    AbilityScores, Armor, Creature, DamageType, Equipment, LimitedAbility, ResourceLedger,
    SaveBonuses, Skill, SpellSlotPool, UsageKind, Weapon,
};
use emberfall_core::error::DomainError;

/// Creature templates keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Bestiary {
    creatures: BTreeMap<String, Creature>,
}

impl Bestiary {
    /// The built-in creatures.
    #[must_use]
    pub fn standard() -> Self {
        Self::default().with_creatures([goblin(), wolf(), skeleton(), bandit(), cultist(), ogre()])
    }

    /// Adds or replaces templates.
    #[must_use]
    pub fn with_creatures(mut self, creatures: impl IntoIterator<Item = Creature>) -> Self {
        for creature in creatures {
            self.creatures.insert(creature.id.clone(), creature);
        }
        self
    }

    /// Looks up a template.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Creature> {
        self.creatures.get(id)
    }

    /// Whether `id` is known.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.creatures.contains_key(id)
    }

    /// A fresh, full-health instance of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownReference`] for an unknown creature.
    pub fn spawn(&self, id: &str) -> Result<Creature, DomainError> {
        let template = self
            .creatures
            .get(id)
            .ok_or_else(|| DomainError::unknown("creature", id))?;
        Ok(Creature {
            hp: template.max_hp,
            resources: template.resources.restore(),
            ..template.clone()
        })
    }

    /// Known creature ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.creatures.keys().map(String::as_str)
    }
}

fn base(id: &str, name: &str, level: u32, abilities: AbilityScores, hp: i32) -> Creature {
    Creature {
        id: id.to_owned(),
        name: name.to_owned(),
        level,
        abilities,
        hp,
        max_hp: hp,
        natural_armor: 0,
        base_attack_bonus: 0,
        saves: SaveBonuses::default(),
        skill_ranks: BTreeMap::new(),
        feats: Vec::new(),
        spells_known: Vec::new(),
        equipment: Equipment::default(),
        resources: ResourceLedger::default(),
        xp_reward: 0,
        gold_reward: 0,
    }
}

fn armed(weapon: Weapon) -> Equipment {
    Equipment {
        weapon: Some(weapon),
        ..Equipment::default()
    }
}

fn goblin() -> Creature {
    Creature {
        base_attack_bonus: 1,
        saves: SaveBonuses {
            fortitude: 2,
            reflex: 0,
            will: 0,
        },
        skill_ranks: BTreeMap::from([(Skill::Stealth, 4)]),
        equipment: Equipment {
            armor: Some(Armor {
                id: "leather".to_owned(),
                name: "Leather armor".to_owned(),
                armor_bonus: 2,
                max_dex: Some(6),
            }),
            ..armed(Weapon::new("short_sword", "Short sword", "1d6", DamageType::Piercing))
        },
        xp_reward: 100,
        gold_reward: 5,
        ..base("goblin", "Goblin", 1, AbilityScores::new(11, 15, 12, 10, 9, 6), 6)
    }
}

fn wolf() -> Creature {
    Creature {
        natural_armor: 2,
        base_attack_bonus: 1,
        saves: SaveBonuses {
            fortitude: 3,
            reflex: 3,
            will: 0,
        },
        skill_ranks: BTreeMap::from([(Skill::Perception, 3), (Skill::Survival, 1)]),
        feats: vec!["savage_bite".to_owned()],
        equipment: armed(Weapon::new("bite", "Bite", "1d6", DamageType::Piercing)),
        resources: ResourceLedger::default().with_ability(LimitedAbility::new(
            "savage_bite",
            UsageKind::Encounter,
            1,
        )),
        xp_reward: 100,
        ..base("wolf", "Wolf", 1, AbilityScores::new(13, 15, 15, 2, 12, 6), 13)
    }
}

fn skeleton() -> Creature {
    Creature {
        natural_armor: 2,
        base_attack_bonus: 0,
        saves: SaveBonuses {
            fortitude: 0,
            reflex: 0,
            will: 2,
        },
        feats: vec!["improved_initiative".to_owned()],
        equipment: armed(Weapon::new("claw", "Claw", "1d4", DamageType::Slashing)),
        xp_reward: 100,
        gold_reward: 2,
        ..base("skeleton", "Skeleton", 1, AbilityScores::new(15, 14, 10, 10, 10, 1), 6)
    }
}

fn bandit() -> Creature {
    Creature {
        base_attack_bonus: 2,
        saves: SaveBonuses {
            fortitude: 3,
            reflex: 0,
            will: 0,
        },
        feats: vec!["power_attack".to_owned()],
        equipment: Equipment {
            armor: Some(Armor {
                id: "studded_leather".to_owned(),
                name: "Studded leather".to_owned(),
                armor_bonus: 3,
                max_dex: Some(5),
            }),
            ..armed(Weapon::new("scimitar", "Scimitar", "1d6", DamageType::Slashing))
        },
        xp_reward: 200,
        gold_reward: 15,
        ..base("bandit", "Bandit", 2, AbilityScores::new(14, 12, 12, 10, 10, 9), 11)
    }
}

fn cultist() -> Creature {
    Creature {
        base_attack_bonus: 1,
        saves: SaveBonuses {
            fortitude: 0,
            reflex: 0,
            will: 3,
        },
        spells_known: vec!["cause_fear".to_owned(), "inflict_light_wounds".to_owned()],
        equipment: armed(Weapon::new("dagger", "Dagger", "1d4", DamageType::Piercing)),
        resources: ResourceLedger {
            abilities: Vec::new(),
            spell_slots: BTreeMap::from([(1, SpellSlotPool { max: 2, current: 2 })]),
        },
        xp_reward: 200,
        gold_reward: 10,
        ..base("cultist", "Cultist", 2, AbilityScores::new(10, 12, 10, 11, 13, 15), 9)
    }
}

fn ogre() -> Creature {
    Creature {
        natural_armor: 5,
        base_attack_bonus: 3,
        saves: SaveBonuses {
            fortitude: 4,
            reflex: 0,
            will: 1,
        },
        feats: vec!["power_attack".to_owned()],
        equipment: armed(Weapon::new("greatclub", "Greatclub", "2d8", DamageType::Bludgeoning)),
        xp_reward: 300,
        gold_reward: 25,
        ..base("ogre", "Ogre", 3, AbilityScores::new(21, 8, 15, 6, 10, 7), 30)
    }
}
