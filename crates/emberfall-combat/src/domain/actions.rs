//! Action resolution shared by both sides of a fight.

use emberfall_character::domain::{Character, StatBlock};
use emberfall_core::dice::{RollContext, RollOverrides, roll_d20};
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_rules::domain::attacks::{
    AttackModifiers, resolve_attack_roll, roll_weapon_damage, weapon_attack_bonus,
};
use emberfall_rules::domain::checks::armor_class;
use emberfall_rules::domain::conditions::{self, ConditionType, aggregate};
use emberfall_rules::domain::feats::{self, FeatError, FeatKind};
use emberfall_rules::domain::items::{self, ItemOutcome};
use emberfall_rules::domain::spells::{self, CastContext, SpellEffect, SpellError, SpellOutcome};
use serde::{Deserialize, Serialize};

use super::engine::{CombatLogEntry, Combatant, Side};

/// A player's chosen action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PlayerAction {
    /// Plain weapon attack.
    Attack,
    /// An attack-variant or ability feat.
    #[serde(rename_all = "camelCase")]
    UseFeat {
        /// Feat id.
        feat_id: String,
    },
    /// A known spell.
    #[serde(rename_all = "camelCase")]
    CastSpell {
        /// Spell id.
        spell_id: String,
    },
    /// A consumable from the pack.
    #[serde(rename_all = "camelCase")]
    UseItem {
        /// Item id.
        item_id: String,
    },
    /// Flee, if the encounter allows it.
    Retreat,
}

/// Why an action did not happen.
#[derive(Debug)]
pub(crate) enum ActionError {
    /// Gameplay failure; the turn is not spent.
    Rejected(String),
    /// Content or state bug.
    Fatal(DomainError),
}

impl From<DomainError> for ActionError {
    fn from(err: DomainError) -> Self {
        Self::Fatal(err)
    }
}

impl From<FeatError> for ActionError {
    fn from(err: FeatError) -> Self {
        Self::Rejected(err.to_string())
    }
}

impl From<SpellError> for ActionError {
    fn from(err: SpellError) -> Self {
        Self::Rejected(err.to_string())
    }
}

/// Mutable state one action may touch besides the two combatants.
pub(crate) struct TurnContext<'a> {
    pub turn: u32,
    pub side: Side,
    pub overrides: &'a mut RollOverrides,
    pub rng: &'a mut dyn DeterministicRng,
    pub log: &'a mut Vec<CombatLogEntry>,
}

impl TurnContext<'_> {
    pub fn say(&mut self, message: String) {
        self.log.push(CombatLogEntry {
            turn: self.turn,
            side: Some(self.side),
            message,
        });
    }

    fn own_context(&self) -> RollContext {
        self.side.roll_context()
    }

    fn opposing_context(&self) -> RollContext {
        self.side.opponent().roll_context()
    }
}

/// Applies damage, waking a sleeping target.
pub(crate) fn deal_damage<D: StatBlock>(
    defender: &mut Combatant<D>,
    amount: i32,
    ctx: &mut TurnContext<'_>,
) {
    if amount <= 0 {
        return;
    }
    defender.entity = defender.entity.take_damage(amount);
    if conditions::has(&defender.conditions, ConditionType::Asleep) {
        defender.conditions = conditions::remove(&defender.conditions, ConditionType::Asleep);
        ctx.say(format!("{} wakes up.", defender.entity.name()));
    }
}

/// Weapon attack, optionally through an attack feat.
pub(crate) fn attack<A: StatBlock, D: StatBlock>(
    attacker: &mut Combatant<A>,
    defender: &mut Combatant<D>,
    feat_id: Option<&str>,
    ctx: &mut TurnContext<'_>,
) -> Result<(), ActionError> {
    let (modifiers, on_hit) = match feat_id {
        Some(id) => {
            let applied =
                feats::apply_attack_feat(&attacker.entity, id, &attacker.conditions, ctx.turn)?;
            attacker.entity = applied.entity;
            attacker.conditions = applied.conditions;
            let name = feats::feat(id).map_or(id, |f| f.name);
            ctx.say(format!("{} uses {name}.", attacker.entity.name()));
            (applied.modifiers, applied.on_hit)
        }
        None => (AttackModifiers::default(), None),
    };

    let attacker_mods = aggregate(&attacker.conditions);
    let own = ctx.own_context();
    let natural = roll_d20(ctx.rng, ctx.overrides, own);
    let bonus = weapon_attack_bonus(&attacker.entity, &modifiers, &attacker_mods);
    let target_ac = armor_class(&defender.entity) + aggregate(&defender.conditions).armor_class;
    let roll = resolve_attack_roll(natural, bonus, target_ac);

    if !roll.hit {
        ctx.say(format!(
            "{} attacks {} and misses ({} vs AC {target_ac}).",
            attacker.entity.name(),
            defender.entity.name(),
            roll.total
        ));
        return Ok(());
    }

    let damage = roll_weapon_damage(
        &attacker.entity,
        &modifiers,
        &attacker_mods,
        roll.critical,
        ctx.rng,
    )?;
    let crit = if roll.critical { "Critical hit! " } else { "" };
    ctx.say(format!(
        "{crit}{} hits {} for {} {} damage ({} vs AC {target_ac}).",
        attacker.entity.name(),
        defender.entity.name(),
        damage.total,
        damage.damage_type.label(),
        roll.total
    ));
    deal_damage(defender, damage.total, ctx);

    if let Some(condition) = on_hit {
        if !defender.entity.is_defeated() {
            defender.conditions = conditions::apply(&defender.conditions, condition, ctx.turn, None);
            ctx.say(format!(
                "{} is {}.",
                defender.entity.name(),
                condition.display_name()
            ));
        }
    }
    Ok(())
}

/// A feat of either usable kind.
pub(crate) fn use_feat<A: StatBlock, D: StatBlock>(
    actor: &mut Combatant<A>,
    opponent: &mut Combatant<D>,
    feat_id: &str,
    ctx: &mut TurnContext<'_>,
) -> Result<(), ActionError> {
    match feats::feat(feat_id).map(|f| f.kind) {
        Some(FeatKind::AttackVariant) => attack(actor, opponent, Some(feat_id), ctx),
        Some(FeatKind::Ability) => {
            let used =
                feats::apply_ability_feat(&actor.entity, feat_id, &actor.conditions, ctx.turn)?;
            actor.entity = used.entity;
            actor.conditions = used.conditions;
            let name = feats::feat(feat_id).map_or(feat_id, |f| f.name);
            let effect = used
                .applied
                .map(|c| format!(" and is {}", c.display_name()))
                .unwrap_or_default();
            ctx.say(format!("{} uses {name}{effect}.", actor.entity.name()));
            Ok(())
        }
        Some(FeatKind::Passive) => Err(ActionError::Rejected(format!(
            "{feat_id} is always active and cannot be used"
        ))),
        None => Err(FeatError::FeatNotFound(feat_id.to_owned()).into()),
    }
}

/// Casts a spell and applies its outcome.
pub(crate) fn cast<A: StatBlock, D: StatBlock>(
    caster: &mut Combatant<A>,
    target: &mut Combatant<D>,
    spell_id: &str,
    ctx: &mut TurnContext<'_>,
) -> Result<(), ActionError> {
    let own = ctx.own_context();
    let opposing = ctx.opposing_context();
    let forced_d20 = match spells::spell(spell_id).map(|s| s.effect) {
        Some(SpellEffect::AttackRoll { .. }) => ctx.overrides.take(own),
        Some(SpellEffect::SavingThrow { .. }) => ctx.overrides.take(opposing),
        Some(SpellEffect::Buff { .. }) | None => None,
    };
    let cast = spells::cast_spell(
        &caster.entity,
        &target.entity,
        spell_id,
        CastContext {
            caster_conditions: &caster.conditions,
            target_conditions: &target.conditions,
            forced_d20,
            rng: &mut *ctx.rng,
        },
    )?;
    caster.entity = cast.caster;
    ctx.say(cast.message);

    match cast.outcome {
        SpellOutcome::Buff {
            condition,
            modifiers,
            duration,
        } => {
            caster.conditions = conditions::apply_with_modifiers(
                &caster.conditions,
                condition,
                ctx.turn,
                Some(duration),
                modifiers,
            );
        }
        SpellOutcome::Hit { damage, .. } => deal_damage(target, damage, ctx),
        SpellOutcome::Save {
            damage, condition, ..
        } => {
            deal_damage(target, damage, ctx);
            if let Some(condition) = condition {
                if !target.entity.is_defeated() {
                    target.conditions =
                        conditions::apply(&target.conditions, condition, ctx.turn, None);
                }
            }
        }
        SpellOutcome::Miss { .. } | SpellOutcome::RequirementsNotMet { .. } => {}
    }
    Ok(())
}

/// Uses one consumable from the player's pack.
pub(crate) fn use_item<D: StatBlock>(
    player: &mut Combatant<Character>,
    enemy: &mut Combatant<D>,
    item_id: &str,
    items_used: &mut Vec<String>,
    ctx: &mut TurnContext<'_>,
) -> Result<(), ActionError> {
    let item = items::consumable(item_id)
        .ok_or_else(|| ActionError::Rejected(format!("{item_id} cannot be used in combat")))?;
    let equipment = player
        .entity
        .equipment
        .without_item(item_id)
        .ok_or_else(|| ActionError::Rejected(format!("You have no {} left", item.name)))?;
    player.entity = player.entity.with_equipment(equipment);
    items_used.push(item_id.to_owned());

    match items::use_consumable(item, ctx.rng) {
        ItemOutcome::Healed { amount } => {
            let before = player.entity.hp;
            player.entity = player.entity.heal(amount);
            ctx.say(format!(
                "{} drinks a {} and recovers {} HP.",
                player.entity.name,
                item.name,
                player.entity.hp - before
            ));
        }
        ItemOutcome::Cured { condition } => {
            player.conditions = conditions::remove(&player.conditions, condition);
            ctx.say(format!(
                "{} uses {} and is no longer {}.",
                player.entity.name,
                item.name,
                condition.display_name()
            ));
        }
        ItemOutcome::Harmed {
            damage,
            damage_type,
            condition,
        } => {
            ctx.say(format!(
                "{} throws {} at {} for {damage} {} damage.",
                player.entity.name,
                item.name,
                enemy.entity.name(),
                damage_type.label()
            ));
            deal_damage(enemy, damage, ctx);
            if let Some(condition) = condition {
                if !enemy.entity.is_defeated() {
                    enemy.conditions =
                        conditions::apply(&enemy.conditions, condition, ctx.turn, None);
                }
            }
        }
    }
    Ok(())
}
