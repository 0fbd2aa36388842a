//! Attack and damage rolls.

use emberfall_character::domain::{Ability, DamageType, StatBlock};
use emberfall_core::dice::DiceExpression;
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::conditions::ConditionModifiers;
use super::feats::passive_bonuses;

/// Per-attack modifiers produced by an attack-variant feat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackModifiers {
    /// Attack roll delta.
    pub attack: i32,
    /// Damage delta.
    pub damage: i32,
    /// Extra damage dice, never doubled on a critical.
    pub bonus_damage: Option<DiceExpression>,
    /// Attacker AC delta for the coming turns.
    pub armor_class: i32,
    /// Use DEX for this attack even without Weapon Finesse.
    pub use_dex_for_attack: bool,
}

/// Outcome of an attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRollResult {
    /// Natural d20.
    pub natural: u32,
    /// Total attack bonus.
    pub bonus: i32,
    /// `natural + bonus`.
    pub total: i32,
    /// Armor class targeted.
    pub target_ac: i32,
    /// Whether the attack connects.
    pub hit: bool,
    /// Natural 20.
    pub critical: bool,
}

/// Damage dealt by one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageRoll {
    /// Weapon dice plus flat bonuses, after doubling on a critical.
    pub base: i32,
    /// Bonus dice from feats.
    pub bonus_dice: i32,
    /// Final damage, at least 1.
    pub total: i32,
    /// Damage type.
    pub damage_type: DamageType,
}

/// Natural 20 always hits as a critical, otherwise `total >= target_ac` hits.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn resolve_attack_roll(natural: u32, bonus: i32, target_ac: i32) -> AttackRollResult {
    let total = natural as i32 + bonus;
    let critical = natural == 20;
    let hit = critical || total >= target_ac;
    AttackRollResult {
        natural,
        bonus,
        total,
        target_ac,
        hit,
        critical,
    }
}

/// Weapon attack bonus: BAB + STR (or DEX for finesse) + enhancement +
/// passive feats + feat and condition deltas.
#[must_use]
pub fn weapon_attack_bonus<E: StatBlock>(
    entity: &E,
    modifiers: &AttackModifiers,
    conditions: &ConditionModifiers,
) -> i32 {
    let passive = passive_bonuses(entity);
    let weapon = entity.equipment().weapon_or_unarmed();
    let strength = entity.modifier(Ability::Strength);
    let ability = if weapon.finesse && (passive.finesse || modifiers.use_dex_for_attack) {
        strength.max(entity.modifier(Ability::Dexterity))
    } else {
        strength
    };
    entity.base_attack_bonus()
        + ability
        + weapon.enhancement
        + passive.attack
        + modifiers.attack
        + conditions.attack
}

/// Rolls weapon damage for a hit.
///
/// A critical doubles the weapon dice; the STR bonus and feat bonus dice
/// are added once.
///
/// # Errors
///
/// Returns [`DomainError::Dice`] if the weapon carries malformed notation.
pub fn roll_weapon_damage<E: StatBlock>(
    entity: &E,
    modifiers: &AttackModifiers,
    conditions: &ConditionModifiers,
    critical: bool,
    rng: &mut dyn DeterministicRng,
) -> Result<DamageRoll, DomainError> {
    let weapon = entity.equipment().weapon_or_unarmed();
    let dice = DiceExpression::parse(&weapon.damage)?;
    let multiplier = if critical { 2 } else { 1 };
    let base = dice.roll_with_dice_multiplier(rng, multiplier)
        + entity.modifier(Ability::Strength)
        + weapon.enhancement
        + modifiers.damage
        + conditions.damage;
    let bonus_dice = modifiers.bonus_damage.map_or(0, |extra| extra.roll(rng));
    let total = (base + bonus_dice).max(1);
    tracing::debug!(entity = entity.name(), base, bonus_dice, total, critical, "weapon damage");
    Ok(DamageRoll {
        base,
        bonus_dice,
        total,
        damage_type: weapon.damage_type,
    })
}

#[cfg(test)]
mod tests {
    use emberfall_character::domain::{Character, CharacterClass, default_character};
    use emberfall_test_support::SequenceRng;

    use super::*;

    #[test]
    fn test_natural_twenty_hits_any_armor_class() {
        let result = resolve_attack_roll(20, 0, 25);

        assert!(result.hit);
        assert!(result.critical);
        assert_eq!(result.total, 20);
    }

    #[test]
    fn test_natural_one_hits_when_total_meets_armor_class() {
        let attack = resolve_attack_roll(1, 30, 10);

        assert!(attack.hit);
        assert!(!attack.critical);
        assert_eq!(attack.total, 31);
    }

    #[test]
    fn test_meeting_armor_class_hits() {
        assert!(resolve_attack_roll(12, 3, 15).hit);
        assert!(!resolve_attack_roll(11, 3, 15).hit);
    }

    #[test]
    fn test_fighter_attack_bonus() {
        let fighter = default_character();
        let power = AttackModifiers {
            attack: -1,
            damage: 2,
            ..AttackModifiers::default()
        };
        let blessed = ConditionModifiers {
            attack: 1,
            ..ConditionModifiers::default()
        };

        // BAB 1 + STR 3 + weapon focus 1
        assert_eq!(
            weapon_attack_bonus(&fighter, &AttackModifiers::default(), &ConditionModifiers::default()),
            5
        );
        assert_eq!(weapon_attack_bonus(&fighter, &power, &blessed), 5);
    }

    #[test]
    fn test_finesse_rogue_uses_dexterity() {
        let class = CharacterClass::Rogue;
        let rogue = Character::new("Vex", class, class.suggested_abilities());

        // BAB 0 + DEX 3
        assert_eq!(
            weapon_attack_bonus(&rogue, &AttackModifiers::default(), &ConditionModifiers::default()),
            3
        );
    }

    #[test]
    fn test_critical_doubles_weapon_dice_only() {
        let fighter = default_character();
        let modifiers = AttackModifiers {
            bonus_damage: Some(DiceExpression::plain(1, 6, 0)),
            ..AttackModifiers::default()
        };
        let mut rng = SequenceRng::new(vec![4, 5, 6]);

        let damage = roll_weapon_damage(
            &fighter,
            &modifiers,
            &ConditionModifiers::default(),
            true,
            &mut rng,
        )
        .unwrap();

        // longsword 4 + 5, STR 3, then one bonus d6
        assert_eq!(damage.base, 12);
        assert_eq!(damage.bonus_dice, 6);
        assert_eq!(damage.total, 18);
        assert_eq!(damage.damage_type, DamageType::Slashing);
    }

    #[test]
    fn test_damage_is_at_least_one() {
        let class = CharacterClass::Wizard;
        let weak = Character {
            abilities: class.suggested_abilities().with_score(Ability::Strength, 3),
            ..Character::new("Ilse", class, class.suggested_abilities())
        };
        let mut rng = SequenceRng::new(vec![1]);

        let damage = roll_weapon_damage(
            &weak,
            &AttackModifiers::default(),
            &ConditionModifiers::default(),
            false,
            &mut rng,
        )
        .unwrap();

        assert_eq!(damage.total, 1);
    }
}
