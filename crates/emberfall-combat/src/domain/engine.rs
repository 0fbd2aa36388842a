//! Combat turn engine.
//!
//! `NotStarted -> RollingInitiative -> PlayerTurn <-> EnemyTurn -> Resolved`.
//!
//! Every transition consumes the current [`Combat`] and returns the next
//! snapshot. A turn runs periodic condition damage, then the action, then
//! ticks the actor's conditions. A rejected player action (no resources,
//! no such item, retreat not allowed) leaves the snapshot as it was apart
//! from a log line explaining why.

use std::cmp::Ordering;

use emberfall_character::domain::resources;
use emberfall_character::domain::{Ability, Character, Creature, StatBlock};
use emberfall_core::dice::{RollContext, RollOverrides, roll_d20};
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_rules::domain::checks::initiative_bonus;
use emberfall_rules::domain::conditions::{self, Condition, aggregate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::actions::{self, ActionError, PlayerAction, TurnContext};
use super::bestiary::Bestiary;
use super::encounter::EncounterSpec;
use super::policy::{self, EnemyAction};

/// A side of the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    /// The player character.
    Player,
    /// The creature.
    Enemy,
}

impl Side {
    /// The other side.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Override key for rolls made by this side.
    #[must_use]
    pub fn roll_context(self) -> RollContext {
        match self {
            Self::Player => RollContext::Player,
            Self::Enemy => RollContext::Enemy,
        }
    }
}

/// How a fight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatOutcome {
    /// The creature fell.
    Victory,
    /// The character fell.
    Defeat,
    /// The character retreated.
    Fled,
}

/// Combat state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatPhase {
    /// Created, initiative not rolled.
    NotStarted,
    /// Initiative is being rolled.
    RollingInitiative,
    /// Waiting for the player's action.
    PlayerTurn,
    /// The creature acts next.
    EnemyTurn,
    /// Finished.
    Resolved(CombatOutcome),
}

/// A fighter and its live conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant<E> {
    /// Stat block.
    pub entity: E,
    /// Live conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl<E> Combatant<E> {
    /// A combatant with no conditions.
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            conditions: Vec::new(),
        }
    }
}

/// One side's initiative roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeRoll {
    /// Who rolled.
    pub side: Side,
    /// Natural d20.
    pub roll: u32,
    /// Initiative bonus.
    pub bonus: i32,
    /// `roll + bonus`.
    pub total: i32,
    /// DEX modifier, the first tie-breaker.
    pub dex_modifier: i32,
}

/// A narrated combat event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatLogEntry {
    /// Turn the entry belongs to; 0 before initiative.
    pub turn: u32,
    /// Acting side, if any.
    pub side: Option<Side>,
    /// Text.
    pub message: String,
}

/// What the narrative layer needs once a fight is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    /// How it ended.
    pub outcome: CombatOutcome,
    /// Full log.
    pub log: Vec<CombatLogEntry>,
    /// Final character state.
    pub player: Character,
    /// Final creature state.
    pub enemy: Creature,
    /// Experience awarded.
    pub xp_gained: u32,
    /// Gold looted.
    pub gold_gained: u32,
    /// Gold lost fleeing.
    pub gold_penalty: u32,
    /// Consumables spent, one entry per unit.
    pub items_used: Vec<String>,
    /// Node to continue at, if the encounter names one.
    pub next_node_id: Option<String>,
}

/// A fight between the character and one creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combat {
    /// The encounter being fought.
    pub encounter: EncounterSpec,
    /// Current phase.
    pub phase: CombatPhase,
    /// Turn counter, 1 after initiative.
    pub turn: u32,
    /// The character.
    pub player: Combatant<Character>,
    /// The creature.
    pub enemy: Combatant<Creature>,
    /// Initiative rolls, winner first.
    #[serde(default)]
    pub initiative: Vec<InitiativeRoll>,
    /// Pending forced d20 results.
    #[serde(default)]
    pub overrides: RollOverrides,
    /// Narrated events.
    #[serde(default)]
    pub log: Vec<CombatLogEntry>,
    /// Consumables spent.
    #[serde(default)]
    pub items_used: Vec<String>,
    /// Experience awarded on victory.
    #[serde(default)]
    pub xp_gained: u32,
    /// Gold looted on victory.
    #[serde(default)]
    pub gold_gained: u32,
    /// Gold lost on retreat.
    #[serde(default)]
    pub gold_penalty: u32,
}

impl Combat {
    /// Sets up a fight that has not rolled initiative yet.
    #[must_use]
    pub fn new(encounter: EncounterSpec, player: Character, enemy: Creature) -> Self {
        Self {
            encounter,
            phase: CombatPhase::NotStarted,
            turn: 0,
            player: Combatant::new(player),
            enemy: Combatant::new(enemy),
            initiative: Vec::new(),
            overrides: RollOverrides::default(),
            log: Vec::new(),
            items_used: Vec::new(),
            xp_gained: 0,
            gold_gained: 0,
            gold_penalty: 0,
        }
    }

    /// Spawns the encounter's creature and sets up the fight.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownReference`] for an unknown creature.
    pub fn start(
        encounter: EncounterSpec,
        player: Character,
        bestiary: &Bestiary,
    ) -> Result<Self, DomainError> {
        let enemy = bestiary.spawn(&encounter.enemy_id)?;
        info!(enemy = %enemy.id, player = %player.name, "combat started");
        Ok(Self::new(encounter, player, enemy))
    }

    /// Forces the next natural d20 rolled by `side`.
    #[must_use]
    pub fn with_forced_d20(mut self, side: Side, natural: u32) -> Self {
        self.overrides.force(side.roll_context(), natural);
        self
    }

    /// Whether the fight is over.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, CombatPhase::Resolved(_))
    }

    /// The outcome, once resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase {
            CombatPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// The result, once resolved.
    #[must_use]
    pub fn result(&self) -> Option<CombatResult> {
        let outcome = self.outcome()?;
        let next_node_id = match outcome {
            CombatOutcome::Victory => self.encounter.on_victory_node_id.clone(),
            CombatOutcome::Defeat => self.encounter.on_defeat_node_id.clone(),
            CombatOutcome::Fled => self
                .encounter
                .retreat
                .as_ref()
                .map(|r| r.safe_node_id.clone()),
        };
        Some(CombatResult {
            outcome,
            log: self.log.clone(),
            player: self.player.entity.clone(),
            enemy: self.enemy.entity.clone(),
            xp_gained: self.xp_gained,
            gold_gained: self.gold_gained,
            gold_penalty: self.gold_penalty,
            items_used: self.items_used.clone(),
            next_node_id,
        })
    }

    /// Rolls initiative for both sides.
    ///
    /// Higher total acts first; ties go to the higher DEX modifier, then
    /// to the player.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless the fight has not
    /// started.
    pub fn roll_initiative(mut self, rng: &mut dyn DeterministicRng) -> Result<Self, DomainError> {
        self.expect_phase(CombatPhase::NotStarted)?;
        self.phase = CombatPhase::RollingInitiative;

        let player = initiative_roll(&self.player.entity, Side::Player, &mut self.overrides, rng);
        let enemy = initiative_roll(&self.enemy.entity, Side::Enemy, &mut self.overrides, rng);
        let player_first = match player.total.cmp(&enemy.total) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => player.dex_modifier >= enemy.dex_modifier,
        };

        let (first, second) = if player_first {
            (player, enemy)
        } else {
            (enemy, player)
        };
        self.initiative = vec![first, second];
        self.turn = 1;
        self.phase = if player_first {
            CombatPhase::PlayerTurn
        } else {
            CombatPhase::EnemyTurn
        };
        let leader = if player_first {
            &self.player.entity.name
        } else {
            &self.enemy.entity.name
        };
        let message = format!(
            "Initiative: {} {} vs {} {}. {leader} acts first.",
            self.player.entity.name, player.total, self.enemy.entity.name, enemy.total,
        );
        self.note(message);
        info!(player = player.total, enemy = enemy.total, player_first, "initiative rolled");
        Ok(self)
    }

    /// Resolves the player's turn.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] outside the player's turn and
    /// propagates content errors such as malformed weapon dice.
    pub fn take_player_turn(
        self,
        action: &PlayerAction,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        self.expect_phase(CombatPhase::PlayerTurn)?;
        let before = self.clone();
        let mut next = self;

        if next.start_turn(Side::Player, rng) {
            return Ok(next);
        }
        if next.skip_if_prevented(Side::Player) {
            return Ok(next.end_turn(Side::Player));
        }

        match next.resolve_player_action(action, rng) {
            Ok(()) => Ok(next.end_turn(Side::Player)),
            Err(ActionError::Rejected(reason)) => {
                warn!(?action, %reason, "player action rejected");
                let mut unchanged = before;
                let turn = unchanged.turn;
                unchanged.log.push(CombatLogEntry {
                    turn,
                    side: Some(Side::Player),
                    message: reason,
                });
                Ok(unchanged)
            }
            Err(ActionError::Fatal(err)) => Err(err),
        }
    }

    /// Resolves the creature's turn using the enemy policy.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] outside the enemy's turn and
    /// propagates content errors.
    pub fn take_enemy_turn(self, rng: &mut dyn DeterministicRng) -> Result<Self, DomainError> {
        self.expect_phase(CombatPhase::EnemyTurn)?;
        let mut next = self;

        if next.start_turn(Side::Enemy, rng) {
            return Ok(next);
        }
        if next.skip_if_prevented(Side::Enemy) {
            return Ok(next.end_turn(Side::Enemy));
        }

        let action = policy::choose_action(&next.enemy.entity, &next.enemy.conditions);
        match next.resolve_enemy_action(&action, rng) {
            Ok(()) => {}
            Err(ActionError::Rejected(reason)) => {
                warn!(?action, %reason, "enemy action rejected, falling back to attack");
                next.resolve_enemy_action(&EnemyAction::Attack { feat_id: None }, rng)
                    .map_err(|err| match err {
                        ActionError::Fatal(err) => err,
                        ActionError::Rejected(reason) => DomainError::InvalidState(reason),
                    })?;
            }
            Err(ActionError::Fatal(err)) => return Err(err),
        }
        Ok(next.end_turn(Side::Enemy))
    }

    /// Runs enemy turns until the player must act or the fight ends.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Combat::take_enemy_turn`].
    pub fn advance(self, rng: &mut dyn DeterministicRng) -> Result<Self, DomainError> {
        let mut next = self;
        while next.phase == CombatPhase::EnemyTurn {
            next = next.take_enemy_turn(rng)?;
        }
        Ok(next)
    }

    fn expect_phase(&self, expected: CombatPhase) -> Result<(), DomainError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(DomainError::InvalidState(format!(
                "combat is in {:?}, expected {expected:?}",
                self.phase
            )))
        }
    }

    fn note(&mut self, message: String) {
        self.log.push(CombatLogEntry {
            turn: self.turn,
            side: None,
            message,
        });
    }

    fn say(&mut self, side: Side, message: String) {
        self.log.push(CombatLogEntry {
            turn: self.turn,
            side: Some(side),
            message,
        });
    }

    fn actor_conditions(&self, side: Side) -> &[Condition] {
        match side {
            Side::Player => &self.player.conditions,
            Side::Enemy => &self.enemy.conditions,
        }
    }

    fn actor_name(&self, side: Side) -> String {
        match side {
            Side::Player => self.player.entity.name.clone(),
            Side::Enemy => self.enemy.entity.name.clone(),
        }
    }

    /// Periodic damage for the actor. Returns `true` if the fight ended.
    fn start_turn(&mut self, side: Side, rng: &mut dyn DeterministicRng) -> bool {
        let report = conditions::roll_periodic_damage(self.actor_conditions(side), rng);
        if report.total == 0 {
            return false;
        }
        let breakdown = report
            .entries
            .iter()
            .map(|e| format!("{} {} ({})", e.amount, e.damage_type.label(), e.condition_type.display_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let name = self.actor_name(side);
        self.say(side, format!("{name} takes {} damage: {breakdown}.", report.total));
        match side {
            Side::Player => self.player.entity = self.player.entity.take_damage(report.total),
            Side::Enemy => self.enemy.entity = self.enemy.entity.take_damage(report.total),
        }
        self.check_resolution()
    }

    /// Logs a lost turn if the actor cannot act.
    fn skip_if_prevented(&mut self, side: Side) -> bool {
        if !aggregate(self.actor_conditions(side)).prevents_actions {
            return false;
        }
        let name = self.actor_name(side);
        self.say(side, format!("{name} cannot act this turn."));
        true
    }

    fn resolve_player_action(
        &mut self,
        action: &PlayerAction,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), ActionError> {
        if *action == PlayerAction::Retreat {
            return self.retreat();
        }
        let Self {
            player,
            enemy,
            overrides,
            log,
            items_used,
            turn,
            ..
        } = self;
        let mut ctx = TurnContext {
            turn: *turn,
            side: Side::Player,
            overrides,
            rng,
            log,
        };
        match action {
            PlayerAction::Attack => actions::attack(player, enemy, None, &mut ctx),
            PlayerAction::UseFeat { feat_id } => actions::use_feat(player, enemy, feat_id, &mut ctx),
            PlayerAction::CastSpell { spell_id } => actions::cast(player, enemy, spell_id, &mut ctx),
            PlayerAction::UseItem { item_id } => {
                actions::use_item(player, enemy, item_id, items_used, &mut ctx)
            }
            PlayerAction::Retreat => Ok(()),
        }
    }

    fn resolve_enemy_action(
        &mut self,
        action: &EnemyAction,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), ActionError> {
        let Self {
            player,
            enemy,
            overrides,
            log,
            turn,
            ..
        } = self;
        let mut ctx = TurnContext {
            turn: *turn,
            side: Side::Enemy,
            overrides,
            rng,
            log,
        };
        match action {
            EnemyAction::Attack { feat_id } => {
                actions::attack(enemy, player, feat_id.as_deref(), &mut ctx)
            }
            EnemyAction::CastSpell { spell_id } => actions::cast(enemy, player, spell_id, &mut ctx),
        }
    }

    fn retreat(&mut self) -> Result<(), ActionError> {
        let Some(penalty) = self.encounter.retreat.clone() else {
            return Err(ActionError::Rejected(
                "There is no escape from this fight.".to_owned(),
            ));
        };
        let before = self.player.entity.hp;
        let hp = (before - penalty.hp.max(0)).max(1).min(before);
        self.player.entity = self.player.entity.with_hp(hp);
        self.gold_penalty = penalty.gold;
        let message = format!(
            "{} flees, losing {} HP and dropping {} gold.",
            self.player.entity.name,
            before - hp,
            penalty.gold
        );
        self.say(Side::Player, message);
        self.finish(CombatOutcome::Fled);
        Ok(())
    }

    /// Checks hit points and resolves the fight if either side fell.
    fn check_resolution(&mut self) -> bool {
        if self.enemy.entity.is_defeated() {
            let name = self.enemy.entity.name.clone();
            self.note(format!("{name} is defeated."));
            self.finish(CombatOutcome::Victory);
            true
        } else if self.player.entity.is_defeated() {
            let name = self.player.entity.name.clone();
            self.note(format!("{name} falls."));
            self.finish(CombatOutcome::Defeat);
            true
        } else {
            false
        }
    }

    fn end_turn(mut self, side: Side) -> Self {
        if self.is_resolved() || self.check_resolution() {
            return self;
        }

        let ticked = conditions::decrement(self.actor_conditions(side));
        for expired in &ticked.expired {
            let name = self.actor_name(side);
            self.say(
                side,
                format!("{name} is no longer {}.", expired.condition_type.display_name()),
            );
        }
        match side {
            Side::Player => self.player.conditions = ticked.remaining,
            Side::Enemy => self.enemy.conditions = ticked.remaining,
        }

        self.turn += 1;
        self.phase = match side.opponent() {
            Side::Player => CombatPhase::PlayerTurn,
            Side::Enemy => CombatPhase::EnemyTurn,
        };
        self
    }

    fn finish(&mut self, outcome: CombatOutcome) {
        self.phase = CombatPhase::Resolved(outcome);
        self.player.conditions.clear();
        self.enemy.conditions.clear();
        self.player.entity = resources::restore_encounter(&self.player.entity);
        self.enemy.entity = resources::restore_encounter(&self.enemy.entity);

        if outcome == CombatOutcome::Victory {
            self.xp_gained = self.enemy.entity.xp_reward;
            self.gold_gained = self.enemy.entity.gold_reward;
            self.player.entity = self.player.entity.gain_experience(self.xp_gained);
            let message = format!(
                "Victory! {} XP and {} gold.",
                self.xp_gained, self.gold_gained
            );
            self.note(message);
        }
        info!(?outcome, turn = self.turn, "combat resolved");
    }
}

fn initiative_roll<E: StatBlock>(
    entity: &E,
    side: Side,
    overrides: &mut RollOverrides,
    rng: &mut dyn DeterministicRng,
) -> InitiativeRoll {
    let roll = roll_d20(rng, overrides, side.roll_context());
    let bonus = initiative_bonus(entity);
    #[allow(clippy::cast_possible_wrap)]
    let total = roll as i32 + bonus;
    InitiativeRoll {
        side,
        roll,
        bonus,
        total,
        dex_modifier: entity.modifier(Ability::Dexterity),
    }
}
