//! Feat catalog and resolver.
//!
//! Feats come in three mechanical kinds. Attack variants modify a single
//! weapon attack, ability feats put a condition on their user, and passive
//! feats add flat bonuses that are summed once into [`PassiveBonuses`].

use emberfall_character::domain::resources::{self, ResourceFailure, ResourceRef};
use emberfall_character::domain::{Ability, CharacterClass, StatBlock};
use emberfall_core::dice::DiceExpression;
use serde::Serialize;
use thiserror::Error;

use super::attacks::AttackModifiers;
use super::conditions::{self, Condition, ConditionModifiers, ConditionType};

/// What a feat does mechanically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatKind {
    /// Modifies one weapon attack.
    AttackVariant,
    /// Always-on flat bonuses.
    Passive,
    /// A self-targeted action.
    Ability,
}

/// Catalog grouping, used for level-up presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatCategory {
    /// Offensive techniques.
    Combat,
    /// Defensive techniques.
    Defense,
    /// Class features.
    Class,
    /// Save and initiative boosts.
    General,
    /// Natural abilities of monsters; never offered to characters.
    Monster,
}

/// How long a feat's self-applied effect lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatDuration {
    /// Resolves within the action.
    Instant,
    /// Lasts a number of turns.
    Turns(u32),
    /// Lasts until the encounter ends.
    Encounter,
}

/// Requirements for taking a feat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisites {
    /// Minimum base attack bonus.
    pub min_base_attack: i32,
    /// Minimum ability scores.
    pub min_abilities: &'static [(Ability, i32)],
    /// Required class.
    pub class: Option<CharacterClass>,
    /// Feats that must already be owned.
    pub feats: &'static [&'static str],
}

impl Prerequisites {
    const NONE: Self = Self {
        min_base_attack: 0,
        min_abilities: &[],
        class: None,
        feats: &[],
    };
}

/// A feat's effect bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatEffect {
    /// Attack roll delta.
    pub attack: i32,
    /// Damage delta.
    pub damage: i32,
    /// Armor class delta.
    pub armor_class: i32,
    /// Initiative delta (passive).
    pub initiative: i32,
    /// Fortitude delta (passive).
    pub fortitude: i32,
    /// Reflex delta (passive).
    pub reflex: i32,
    /// Will delta (passive).
    pub will: i32,
    /// Extra damage dice on a hit.
    pub bonus_damage: Option<DiceExpression>,
    /// Use DEX instead of STR on attack rolls with finesse weapons.
    pub use_dex_for_attack: bool,
    /// Condition applied on hit (attack variants) or to self (abilities).
    pub condition: Option<ConditionType>,
    /// Limited ability spent per use.
    pub resource_cost: Option<&'static str>,
    /// Duration class of the effect.
    pub duration: FeatDuration,
}

impl FeatEffect {
    const NONE: Self = Self {
        attack: 0,
        damage: 0,
        armor_class: 0,
        initiative: 0,
        fortitude: 0,
        reflex: 0,
        will: 0,
        bonus_damage: None,
        use_dex_for_attack: false,
        condition: None,
        resource_cost: None,
        duration: FeatDuration::Instant,
    };
}

/// An immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feat {
    /// Stable id referenced from stat blocks.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Catalog group.
    pub category: FeatCategory,
    /// Mechanical kind.
    pub kind: FeatKind,
    /// Requirements.
    pub prerequisites: Prerequisites,
    /// Effect bundle.
    pub effect: FeatEffect,
}

const CATALOG: &[Feat] = &[
    Feat {
        id: "power_attack",
        name: "Power Attack",
        category: FeatCategory::Combat,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            min_abilities: &[(Ability::Strength, 13)],
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            attack: -1,
            damage: 2,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "combat_expertise",
        name: "Combat Expertise",
        category: FeatCategory::Defense,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            min_abilities: &[(Ability::Intelligence, 13)],
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            attack: -1,
            armor_class: 1,
            duration: FeatDuration::Turns(2),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "sneak_attack",
        name: "Sneak Attack",
        category: FeatCategory::Class,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            class: Some(CharacterClass::Rogue),
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            bonus_damage: Some(DiceExpression::plain(1, 6, 0)),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "vital_strike",
        name: "Vital Strike",
        category: FeatCategory::Combat,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            min_base_attack: 6,
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            bonus_damage: Some(DiceExpression::plain(1, 8, 0)),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "stunning_fist",
        name: "Stunning Fist",
        category: FeatCategory::Combat,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            min_base_attack: 2,
            min_abilities: &[(Ability::Dexterity, 13), (Ability::Wisdom, 13)],
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            attack: -2,
            condition: Some(ConditionType::Stunned),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "poisoned_blade",
        name: "Poisoned Blade",
        category: FeatCategory::Class,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites {
            class: Some(CharacterClass::Rogue),
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            condition: Some(ConditionType::Poisoned),
            resource_cost: Some("poison_vial"),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "savage_bite",
        name: "Savage Bite",
        category: FeatCategory::Monster,
        kind: FeatKind::AttackVariant,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            condition: Some(ConditionType::Bleeding),
            resource_cost: Some("savage_bite"),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "battle_rage",
        name: "Battle Rage",
        category: FeatCategory::Class,
        kind: FeatKind::Ability,
        prerequisites: Prerequisites {
            class: Some(CharacterClass::Fighter),
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            condition: Some(ConditionType::Raging),
            resource_cost: Some("battle_rage"),
            duration: FeatDuration::Turns(4),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "dodge",
        name: "Dodge",
        category: FeatCategory::Defense,
        kind: FeatKind::Ability,
        prerequisites: Prerequisites {
            min_abilities: &[(Ability::Dexterity, 13)],
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            condition: Some(ConditionType::Dodging),
            duration: FeatDuration::Turns(3),
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "prayer_of_valor",
        name: "Prayer of Valor",
        category: FeatCategory::Class,
        kind: FeatKind::Ability,
        prerequisites: Prerequisites {
            class: Some(CharacterClass::Cleric),
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            condition: Some(ConditionType::Blessed),
            resource_cost: Some("channel_energy"),
            duration: FeatDuration::Encounter,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "improved_initiative",
        name: "Improved Initiative",
        category: FeatCategory::General,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            initiative: 4,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "weapon_focus",
        name: "Weapon Focus",
        category: FeatCategory::Combat,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites {
            min_base_attack: 1,
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            attack: 1,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "weapon_finesse",
        name: "Weapon Finesse",
        category: FeatCategory::Combat,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            use_dex_for_attack: true,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "iron_will",
        name: "Iron Will",
        category: FeatCategory::General,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            will: 2,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "lightning_reflexes",
        name: "Lightning Reflexes",
        category: FeatCategory::General,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            reflex: 2,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "great_fortitude",
        name: "Great Fortitude",
        category: FeatCategory::General,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites::NONE,
        effect: FeatEffect {
            fortitude: 2,
            ..FeatEffect::NONE
        },
    },
    Feat {
        id: "shield_focus",
        name: "Shield Focus",
        category: FeatCategory::Defense,
        kind: FeatKind::Passive,
        prerequisites: Prerequisites {
            min_base_attack: 1,
            feats: &["dodge"],
            ..Prerequisites::NONE
        },
        effect: FeatEffect {
            armor_class: 1,
            ..FeatEffect::NONE
        },
    },
];

/// Looks up a feat by id.
#[must_use]
pub fn feat(id: &str) -> Option<&'static Feat> {
    CATALOG.iter().find(|f| f.id == id)
}

/// Every catalog entry.
#[must_use]
pub fn catalog() -> &'static [Feat] {
    CATALOG
}

/// Why a feat could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatError {
    /// The feat is not in the catalog or not owned by the user.
    #[error("feat not found: {0}")]
    FeatNotFound(String),
    /// The feat exists but is of a different kind.
    #[error("{feat} cannot be used that way")]
    WrongFeatKind {
        /// The feat id.
        feat: String,
        /// The kind the caller needed.
        expected: FeatKind,
    },
    /// The feat's resource cost could not be paid.
    #[error(transparent)]
    InsufficientResource(#[from] ResourceFailure),
}

/// Flat bonuses from all owned passive feats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveBonuses {
    /// Initiative.
    pub initiative: i32,
    /// Weapon attack rolls.
    pub attack: i32,
    /// Armor class.
    pub armor_class: i32,
    /// Fortitude.
    pub fortitude: i32,
    /// Reflex.
    pub reflex: i32,
    /// Will.
    pub will: i32,
    /// DEX may replace STR on finesse weapon attacks.
    pub finesse: bool,
}

/// Sums every owned passive feat.
#[must_use]
pub fn passive_bonuses<E: StatBlock>(entity: &E) -> PassiveBonuses {
    entity
        .feats()
        .iter()
        .filter_map(|id| feat(id))
        .filter(|f| f.kind == FeatKind::Passive)
        .fold(PassiveBonuses::default(), |acc, f| PassiveBonuses {
            initiative: acc.initiative + f.effect.initiative,
            attack: acc.attack + f.effect.attack,
            armor_class: acc.armor_class + f.effect.armor_class,
            fortitude: acc.fortitude + f.effect.fortitude,
            reflex: acc.reflex + f.effect.reflex,
            will: acc.will + f.effect.will,
            finesse: acc.finesse || f.effect.use_dex_for_attack,
        })
}

/// Output of [`apply_attack_feat`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttackFeatResult<E> {
    /// The attacker after paying any resource cost.
    pub entity: E,
    /// The attacker's conditions after self effects such as an AC delta.
    pub conditions: Vec<Condition>,
    /// Modifiers for this attack.
    pub modifiers: AttackModifiers,
    /// Condition for the target if the attack hits.
    pub on_hit: Option<ConditionType>,
}

/// Output of [`apply_ability_feat`].
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityFeatResult<E> {
    /// The user after paying any resource cost.
    pub entity: E,
    /// The user's conditions with the feat's condition applied.
    pub conditions: Vec<Condition>,
    /// The condition applied, if any.
    pub applied: Option<ConditionType>,
}

fn owned_feat<E: StatBlock>(
    entity: &E,
    feat_id: &str,
    expected: FeatKind,
) -> Result<&'static Feat, FeatError> {
    let found = feat(feat_id)
        .filter(|_| entity.has_feat(feat_id))
        .ok_or_else(|| FeatError::FeatNotFound(feat_id.to_owned()))?;
    if found.kind != expected {
        return Err(FeatError::WrongFeatKind {
            feat: feat_id.to_owned(),
            expected,
        });
    }
    Ok(found)
}

fn pay_cost<E: StatBlock>(entity: &E, found: &Feat) -> Result<E, FeatError> {
    match found.effect.resource_cost {
        Some(cost) => Ok(resources::consume(
            entity,
            &ResourceRef::Ability(cost.to_owned()),
        )?),
        None => Ok(entity.clone()),
    }
}

fn duration_override(duration: FeatDuration) -> Option<u32> {
    match duration {
        FeatDuration::Instant => None,
        FeatDuration::Turns(turns) => Some(turns),
        // Outlasts any fight; cleared when combat ends.
        FeatDuration::Encounter => Some(u32::MAX),
    }
}

/// Resolves an attack-variant feat.
///
/// # Errors
///
/// [`FeatError::FeatNotFound`] if the feat is unknown or not owned,
/// [`FeatError::WrongFeatKind`] if it is not an attack variant, and
/// [`FeatError::InsufficientResource`] if its cost cannot be paid. The
/// input entity is never modified.
pub fn apply_attack_feat<E: StatBlock>(
    entity: &E,
    feat_id: &str,
    conditions: &[Condition],
    turn: u32,
) -> Result<AttackFeatResult<E>, FeatError> {
    let found = owned_feat(entity, feat_id, FeatKind::AttackVariant)?;
    let paid = pay_cost(entity, found)?;
    let effect = found.effect;

    let conditions = if effect.armor_class == 0 {
        conditions.to_vec()
    } else {
        conditions::apply_with_modifiers(
            conditions,
            ConditionType::Defensive,
            turn,
            duration_override(effect.duration),
            ConditionModifiers {
                armor_class: effect.armor_class,
                ..ConditionModifiers::default()
            },
        )
    };

    tracing::debug!(entity = entity.name(), feat = feat_id, "attack feat applied");
    Ok(AttackFeatResult {
        entity: paid,
        conditions,
        modifiers: AttackModifiers {
            attack: effect.attack,
            damage: effect.damage,
            bonus_damage: effect.bonus_damage,
            armor_class: effect.armor_class,
            use_dex_for_attack: effect.use_dex_for_attack,
        },
        on_hit: effect.condition,
    })
}

/// Resolves an ability feat, applying its condition to the user.
///
/// # Errors
///
/// Same failures as [`apply_attack_feat`], with
/// [`FeatError::WrongFeatKind`] for anything that is not an ability feat.
pub fn apply_ability_feat<E: StatBlock>(
    entity: &E,
    feat_id: &str,
    conditions: &[Condition],
    turn: u32,
) -> Result<AbilityFeatResult<E>, FeatError> {
    let found = owned_feat(entity, feat_id, FeatKind::Ability)?;
    let paid = pay_cost(entity, found)?;

    let conditions = match found.effect.condition {
        Some(condition) => conditions::apply(
            conditions,
            condition,
            turn,
            duration_override(found.effect.duration),
        ),
        None => conditions.to_vec(),
    };

    tracing::debug!(entity = entity.name(), feat = feat_id, "ability feat used");
    Ok(AbilityFeatResult {
        entity: paid,
        conditions,
        applied: found.effect.condition,
    })
}

/// Lists the prerequisites `entity` does not meet for `feat`.
#[must_use]
pub fn check_prerequisites<E: StatBlock>(entity: &E, feat: &Feat) -> Vec<String> {
    let mut unmet = Vec::new();
    let prerequisites = feat.prerequisites;

    if entity.base_attack_bonus() < prerequisites.min_base_attack {
        unmet.push(format!(
            "requires base attack bonus +{}",
            prerequisites.min_base_attack
        ));
    }
    for (ability, minimum) in prerequisites.min_abilities {
        if entity.abilities().score(*ability) < *minimum {
            unmet.push(format!("requires {} {minimum}", ability.abbreviation()));
        }
    }
    if let Some(class) = prerequisites.class {
        if entity.class() != Some(class) {
            unmet.push(format!("requires class {}", class.display_name()));
        }
    }
    for required in prerequisites.feats {
        if !entity.has_feat(required) {
            unmet.push(format!("requires feat {required}"));
        }
    }
    unmet
}

/// Feats `entity` could take at level up.
#[must_use]
pub fn eligible_feats<E: StatBlock>(entity: &E) -> Vec<&'static Feat> {
    CATALOG
        .iter()
        .filter(|f| f.category != FeatCategory::Monster)
        .filter(|f| !entity.has_feat(f.id))
        .filter(|f| check_prerequisites(entity, f).is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use emberfall_character::domain::{Character, default_character};

    use super::*;

    fn rogue() -> Character {
        let class = CharacterClass::Rogue;
        Character::new("Vex", class, class.suggested_abilities())
    }

    #[test]
    fn test_power_attack_trades_accuracy_for_damage() {
        let fighter = default_character();

        let result = apply_attack_feat(&fighter, "power_attack", &[], 1).unwrap();

        assert_eq!(result.modifiers.attack, -1);
        assert_eq!(result.modifiers.damage, 2);
        assert_eq!(result.entity, fighter);
        assert!(result.conditions.is_empty());
    }

    #[test]
    fn test_unknown_feat_is_not_found() {
        let err = apply_attack_feat(&default_character(), "whirlwind", &[], 1).unwrap_err();
        assert_eq!(err, FeatError::FeatNotFound("whirlwind".to_owned()));
    }

    #[test]
    fn test_unowned_feat_is_not_found() {
        let err = apply_attack_feat(&default_character(), "sneak_attack", &[], 1).unwrap_err();
        assert_eq!(err, FeatError::FeatNotFound("sneak_attack".to_owned()));
    }

    #[test]
    fn test_ability_feat_used_as_attack_is_wrong_kind() {
        let err = apply_attack_feat(&default_character(), "battle_rage", &[], 1).unwrap_err();
        assert!(matches!(err, FeatError::WrongFeatKind { .. }));
    }

    #[test]
    fn test_poisoned_blade_spends_vial_and_poisons_on_hit() {
        let rogue = rogue();

        let first = apply_attack_feat(&rogue, "poisoned_blade", &[], 1).unwrap();
        let second = apply_attack_feat(&first.entity, "poisoned_blade", &[], 2).unwrap();
        let third = apply_attack_feat(&second.entity, "poisoned_blade", &[], 3);

        assert_eq!(first.on_hit, Some(ConditionType::Poisoned));
        assert!(matches!(third, Err(FeatError::InsufficientResource(_))));
        assert_eq!(
            rogue
                .resources
                .remaining(&ResourceRef::Ability("poison_vial".to_owned())),
            Some(2)
        );
    }

    #[test]
    fn test_combat_expertise_applies_defensive_condition() {
        let fighter = Character {
            feats: vec!["combat_expertise".to_owned()],
            ..default_character()
        };

        let result = apply_attack_feat(&fighter, "combat_expertise", &[], 3).unwrap();

        assert_eq!(result.modifiers.armor_class, 1);
        assert_eq!(result.conditions.len(), 1);
        assert_eq!(result.conditions[0].condition_type, ConditionType::Defensive);
        assert_eq!(result.conditions[0].turns_remaining, 2);
    }

    #[test]
    fn test_battle_rage_applies_raging_once_per_day() {
        let fighter = default_character();

        let raged = apply_ability_feat(&fighter, "battle_rage", &[], 1).unwrap();
        let again = apply_ability_feat(&raged.entity, "battle_rage", &raged.conditions, 2);

        assert_eq!(raged.applied, Some(ConditionType::Raging));
        assert_eq!(raged.conditions[0].turns_remaining, 4);
        assert!(matches!(again, Err(FeatError::InsufficientResource(_))));
    }

    #[test]
    fn test_passive_bonuses_sum_owned_passives() {
        let fighter = Character {
            feats: vec![
                "weapon_focus".to_owned(),
                "improved_initiative".to_owned(),
                "power_attack".to_owned(),
                "iron_will".to_owned(),
            ],
            ..default_character()
        };

        let bonuses = passive_bonuses(&fighter);

        assert_eq!(bonuses.attack, 1);
        assert_eq!(bonuses.initiative, 4);
        assert_eq!(bonuses.will, 2);
        assert!(!bonuses.finesse);
        assert!(passive_bonuses(&rogue()).finesse);
    }

    #[test]
    fn test_check_prerequisites_reports_each_gap() {
        let wizard = {
            let class = CharacterClass::Wizard;
            Character::new("Ilse", class, class.suggested_abilities())
        };
        let vital = feat("vital_strike").unwrap();
        let shield_focus = feat("shield_focus").unwrap();

        assert_eq!(
            check_prerequisites(&wizard, vital),
            vec!["requires base attack bonus +6".to_owned()]
        );
        assert_eq!(check_prerequisites(&wizard, shield_focus).len(), 2);
    }

    #[test]
    fn test_eligible_feats_excludes_owned_and_monster_feats() {
        let fighter = default_character();

        let ids: Vec<&str> = eligible_feats(&fighter).iter().map(|f| f.id).collect();

        assert!(ids.contains(&"improved_initiative"));
        assert!(ids.contains(&"dodge"));
        assert!(!ids.contains(&"power_attack"));
        assert!(!ids.contains(&"savage_bite"));
        assert!(!ids.contains(&"sneak_attack"));
        assert!(!ids.contains(&"vital_strike"));
    }
}
