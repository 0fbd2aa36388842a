//! The caller-owned game session.
//!
//! A [`GameSession`] is the only place the narrative, the player character
//! and an in-progress fight meet. Every operation consumes the session and
//! returns the next one; the caller keeps the previous value if an
//! operation fails.

use chrono::{DateTime, Utc};
use emberfall_character::domain::{
    Ability, AbilityScores, Character, CharacterClass, Equipment, StatBlock,
};
use emberfall_combat::domain::{Combat, CombatOutcome, EncounterSpec, PlayerAction};
use emberfall_content::domain::Campaign;
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_narrative::domain::camp::{self, roll_camp_event};
use emberfall_narrative::domain::{
    CampEvent, Effect, Narrative, NarrativeState, Step, TradeAction, Trigger,
};
use emberfall_rules::domain::{feats, items};
use emberfall_world_state::domain::{TradeFailure, WorldState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::config::EngineConfig;
use super::save::{
    CURRENT_SAVE_VERSION, NarrativeSnapshot, SaveError, SaveMetadata, SaveRecord,
};

/// Lowest ability score accepted at character creation.
pub const MIN_CREATION_SCORE: i32 = 3;

/// Highest ability score accepted at character creation.
pub const MAX_CREATION_SCORE: i32 = 18;

/// Longest accepted character name, in characters.
pub const MAX_NAME_LENGTH: usize = 40;

/// Which screen a front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    /// A node waiting for a choice.
    Story,
    /// Building a character.
    CharacterCreation,
    /// A fight.
    Combat,
    /// A merchant's stall.
    Merchant,
    /// A camp event interrupting a rest.
    Camp,
    /// An exploration event.
    Exploration,
    /// Confirming a level-up.
    LevelUp,
    /// The story has ended.
    Ended,
}

/// Why an event table was rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventPurpose {
    /// Resting at camp.
    Rest,
    /// An `explore` outcome.
    Exploration,
}

/// A drawn event waiting for the player's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvent {
    /// Table the event came from.
    pub table_id: String,
    /// The drawn event.
    pub event_id: String,
    /// What the roll was for.
    pub purpose: EventPurpose,
}

/// Why a session wants to be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointReason {
    /// A new game began.
    NewGame,
    /// The narrative entered a different node.
    NodeEntered,
    /// A character joined the session.
    CharacterCreated,
    /// A fight ended.
    CombatFinished,
    /// A long rest completed.
    RestCompleted,
    /// A level-up was confirmed.
    LevelUp,
    /// The player left a merchant.
    MerchantClosed,
    /// The session is being dropped from memory.
    Unloaded,
}

/// One playthrough of a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Session id; also names the save slot.
    pub id: Uuid,
    /// Campaign being played.
    pub campaign_id: String,
    /// The player character, once created.
    pub character: Option<Character>,
    /// Narrative and world.
    pub narrative: Narrative,
    /// Fight in progress.
    pub combat: Option<Combat>,
    /// Camp or exploration event awaiting a choice.
    pub pending_event: Option<PendingEvent>,
    /// When the session last handled a command.
    pub last_played_at: DateTime<Utc>,
    /// Accumulated play time.
    pub play_time_seconds: u64,
    checkpoint: Option<CheckpointReason>,
}

impl GameSession {
    /// Starts a new game at the campaign's start node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] for a missing start node and
    /// propagates errors from any trigger the start node fires.
    pub fn new(
        id: Uuid,
        campaign: &Campaign,
        config: &EngineConfig,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let location = config.starting_location(&campaign.starting_location);
        let world = WorldState::start_campaign(&campaign.id, location);
        let session = Self {
            id,
            campaign_id: campaign.id.clone(),
            character: None,
            narrative: Narrative::new(world),
            combat: None,
            pending_event: None,
            last_played_at: now,
            play_time_seconds: 0,
            checkpoint: None,
        };

        let step = session.narrative.clone().start(&campaign.graph, None)?;
        let mut session = session.absorb(step);
        session.checkpoint = Some(CheckpointReason::NewGame);
        info!(session = %id, campaign = %campaign.id, %location, "new game started");
        session.settle(campaign, rng)
    }

    /// Rebuilds a session from a save record.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::CampaignMismatch`] when the record was written
    /// for another campaign.
    pub fn from_record(
        id: Uuid,
        record: SaveRecord,
        campaign: &Campaign,
    ) -> Result<Self, SaveError> {
        let snapshot = record.narrative;
        if snapshot.campaign_id != campaign.id {
            return Err(SaveError::CampaignMismatch {
                expected: campaign.id.clone(),
                found: snapshot.campaign_id,
            });
        }
        let narrative = Narrative::restore(
            snapshot.world,
            snapshot.conversation,
            snapshot.state,
            &campaign.graph,
        );
        Ok(Self {
            id,
            campaign_id: snapshot.campaign_id,
            character: record.character,
            narrative,
            combat: record.combat,
            pending_event: record.pending_event,
            last_played_at: record.metadata.last_played_timestamp,
            play_time_seconds: record.metadata.play_time_seconds,
            checkpoint: None,
        })
    }

    /// Snapshots the session as a current-version save record.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> SaveRecord {
        SaveRecord {
            version: CURRENT_SAVE_VERSION,
            timestamp: now,
            character: self.character.clone(),
            narrative: NarrativeSnapshot {
                world: self.narrative.world.clone(),
                conversation: Some(self.narrative.conversation.clone()),
                campaign_id: self.campaign_id.clone(),
                state: Some(self.narrative.state.clone()),
            },
            current_screen: self.screen(),
            metadata: SaveMetadata {
                character_name: self
                    .character
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                character_level: self.character.as_ref().map_or(0, |c| c.level),
                last_played_timestamp: self.last_played_at,
                play_time_seconds: self.play_time_seconds,
            },
            combat: self.combat.clone(),
            pending_event: self.pending_event.clone(),
        }
    }

    /// The screen a front end should show.
    #[must_use]
    pub fn screen(&self) -> Screen {
        if self.combat.is_some() {
            return Screen::Combat;
        }
        if let Some(pending) = &self.pending_event {
            return match pending.purpose {
                EventPurpose::Rest => Screen::Camp,
                EventPurpose::Exploration => Screen::Exploration,
            };
        }
        match &self.narrative.state {
            NarrativeState::Inactive => Screen::Ended,
            NarrativeState::Active { .. } => Screen::Story,
            NarrativeState::Suspended { trigger, .. } => match trigger {
                Trigger::Combat(_) => Screen::Combat,
                Trigger::Merchant(_) => Screen::Merchant,
                Trigger::CharacterCreation { .. } => Screen::CharacterCreation,
                Trigger::Exploration { .. } => Screen::Exploration,
                Trigger::LevelUp { .. } => Screen::LevelUp,
            },
        }
    }

    /// Adds the time since the last command to the play clock, ignoring
    /// gaps longer than `max_idle_seconds`.
    pub fn record_activity(&mut self, now: DateTime<Utc>, max_idle_seconds: u64) {
        let elapsed = u64::try_from((now - self.last_played_at).num_seconds()).unwrap_or(0);
        if elapsed <= max_idle_seconds {
            self.play_time_seconds = self.play_time_seconds.saturating_add(elapsed);
        }
        self.last_played_at = now;
    }

    /// Takes the pending checkpoint request, if any.
    pub fn take_checkpoint(&mut self) -> Option<CheckpointReason> {
        self.checkpoint.take()
    }

    /// The camp or exploration event awaiting a choice.
    #[must_use]
    pub fn pending_camp_event<'c>(&self, campaign: &'c Campaign) -> Option<&'c CampEvent> {
        let pending = self.pending_event.as_ref()?;
        campaign
            .table(&pending.table_id)?
            .events
            .iter()
            .find(|e| e.id == pending.event_id)
    }

    /// Selects a choice on the current node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a node is waiting for a
    /// choice, plus any error from resolving the outcome.
    pub fn select_choice(
        self,
        campaign: &Campaign,
        choice_id: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        self.expect_story()?;
        let node_before = self.narrative.world.current_node_id.clone();

        let step = self.narrative.clone().select_choice(
            &campaign.graph,
            choice_id,
            self.character.clone(),
            rng,
        )?;
        let mut session = self.absorb(step);
        if session.narrative.world.current_node_id != node_before {
            session.request_checkpoint(CheckpointReason::NodeEntered);
        }
        session.settle(campaign, rng)
    }

    /// Finishes character creation and enters the follow-up node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for a blank or overlong name or
    /// an ability score outside 3..=18 and [`DomainError::InvalidState`]
    /// unless the narrative is waiting for character creation.
    pub fn create_character(
        self,
        campaign: &Campaign,
        name: &str,
        class: CharacterClass,
        abilities: AbilityScores,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::Validation(format!(
                "character name must be 1 to {MAX_NAME_LENGTH} characters"
            )));
        }
        for ability in Ability::ALL {
            let score = abilities.score(ability);
            if !(MIN_CREATION_SCORE..=MAX_CREATION_SCORE).contains(&score) {
                return Err(DomainError::Validation(format!(
                    "{} {score} is outside {MIN_CREATION_SCORE}..={MAX_CREATION_SCORE}",
                    ability.abbreviation()
                )));
            }
        }

        let character = Character::new(name, class, abilities);
        let step = self
            .narrative
            .clone()
            .resume_after_character_creation(&campaign.graph, character)?;
        let session = self.absorb(step);
        session.settle(campaign, rng)
    }

    /// Takes the player's combat turn and lets the enemy respond.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] when no fight is in progress.
    pub fn combat_action(
        mut self,
        campaign: &Campaign,
        action: &PlayerAction,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let combat = self
            .combat
            .take()
            .ok_or_else(|| DomainError::InvalidState("no combat in progress".to_owned()))?;
        let combat = combat.take_player_turn(action, rng)?.advance(rng)?;
        let resolved = combat.is_resolved();
        self.combat = Some(combat);
        if resolved {
            self.finish_combat(campaign, rng)
        } else {
            Ok(self)
        }
    }

    /// Buys or sells at the open merchant.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a merchant is open.
    pub fn trade(self, action: &TradeAction) -> Result<(Self, Option<TradeFailure>), DomainError> {
        let (narrative, failure) = self.narrative.clone().trade(action)?;
        Ok((Self { narrative, ..self }, failure))
    }

    /// Closes the merchant.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a merchant is open.
    pub fn leave_merchant(self) -> Result<Self, DomainError> {
        let narrative = self.narrative.clone().resume_after_merchant()?;
        let mut session = Self { narrative, ..self };
        session.request_checkpoint(CheckpointReason::MerchantClosed);
        Ok(session)
    }

    /// Applies the pending level-up.
    ///
    /// `feat_choices` replaces the feats the content offered; each must
    /// exist and be available to the character at the new level.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a level-up is pending,
    /// [`DomainError::UnknownReference`] for an unknown feat and
    /// [`DomainError::Validation`] for a feat whose prerequisites fail.
    pub fn confirm_level_up(self, feat_choices: Option<&[String]>) -> Result<Self, DomainError> {
        let Some(Trigger::LevelUp {
            new_level,
            feat_choices: offered,
        }) = self.narrative.trigger().cloned()
        else {
            return Err(DomainError::InvalidState(
                "no level-up is pending".to_owned(),
            ));
        };
        let character = self.require_character()?.clone();

        let chosen = match feat_choices {
            Some(chosen) => {
                let advanced = character.level_up_to(new_level, &[]);
                for feat_id in chosen {
                    let feat =
                        feats::feat(feat_id).ok_or_else(|| DomainError::unknown("feat", feat_id))?;
                    let unmet = feats::check_prerequisites(&advanced, feat);
                    if !unmet.is_empty() {
                        return Err(DomainError::Validation(format!(
                            "{feat_id} is not available: {}",
                            unmet.join(", ")
                        )));
                    }
                }
                chosen.to_vec()
            }
            None => offered,
        };

        let leveled = character.level_up_to(new_level, &chosen);
        let narrative = self.narrative.clone().resume_after_level_up()?;
        let mut session = Self {
            narrative,
            character: Some(leveled),
            ..self
        };
        let message = session
            .character
            .as_ref()
            .map(|hero| format!("{} reaches level {}.", hero.name, hero.level));
        if let Some(message) = message {
            session.note(message);
        }
        session.request_checkpoint(CheckpointReason::LevelUp);
        Ok(session)
    }

    /// Makes camp. Resting at an unlocked sanctuary is always safe;
    /// elsewhere the location's camp table may interrupt.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a node is waiting for a
    /// choice and a character exists.
    pub fn rest(
        mut self,
        campaign: &Campaign,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        self.expect_story()?;
        let character = self.require_character()?;
        let world = &self.narrative.world;

        let drawn = if world.at_sanctuary() {
            None
        } else {
            world
                .current_location_id
                .as_deref()
                .and_then(|location| campaign.camp_table_for(location))
                .and_then(|table| {
                    roll_camp_event(table, world, Some(character), rng).map(|e| (table, e))
                })
        };

        match drawn {
            Some((table, event)) => {
                self.pending_event = Some(PendingEvent {
                    table_id: table.id.clone(),
                    event_id: event.id.clone(),
                    purpose: EventPurpose::Rest,
                });
                let description = event.description.clone();
                self.note(description);
                Ok(self)
            }
            None => Ok(self.complete_rest()),
        }
    }

    /// Resolves the pending camp or exploration event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] when no event is pending and
    /// [`DomainError::ChoiceNotFound`] for an unavailable choice.
    pub fn resolve_event(
        mut self,
        campaign: &Campaign,
        choice_id: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let pending = self
            .pending_event
            .clone()
            .ok_or_else(|| DomainError::InvalidState("no event is waiting".to_owned()))?;
        let event = self
            .pending_camp_event(campaign)
            .ok_or_else(|| DomainError::unknown("camp event", &pending.event_id))?;
        let resolution = event.resolve(choice_id, &self.narrative.world, self.character.as_ref())?;
        self.pending_event = None;

        match pending.purpose {
            EventPurpose::Exploration => {
                let mut effects = resolution.effects;
                if let Some(encounter) = resolution.combat_triggered {
                    effects.push(Effect::StartCombat(encounter));
                }
                let step = self
                    .narrative
                    .clone()
                    .resume_after_exploration(&effects, self.character.clone())?;
                self = self.absorb(step);
            }
            EventPurpose::Rest => {
                let step = self
                    .narrative
                    .clone()
                    .apply(&resolution.effects, self.character.clone());
                self = self.absorb(step);
                if let Some(encounter) = resolution.combat_triggered {
                    self.narrative = self.narrative.suspend_for(Trigger::Combat(encounter));
                } else if resolution.continue_rest && self.narrative.trigger().is_none() {
                    self = self.complete_rest();
                } else {
                    self.note("Your rest is cut short.".to_owned());
                }
            }
        }
        self.settle(campaign, rng)
    }

    /// Starts whatever the narrative is suspended for, when the engine
    /// rather than the player drives it.
    fn settle(
        self,
        campaign: &Campaign,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        if self.combat.is_some() || self.pending_event.is_some() {
            return Ok(self);
        }
        match self.narrative.trigger().cloned() {
            Some(Trigger::Combat(encounter)) => self.begin_combat(encounter, campaign, rng),
            Some(Trigger::Exploration { table_id, .. }) => self.explore(&table_id, campaign, rng),
            _ => Ok(self),
        }
    }

    fn begin_combat(
        mut self,
        encounter: EncounterSpec,
        campaign: &Campaign,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let character = self.require_character()?;
        let pack: Vec<String> = self
            .narrative
            .world
            .inventory
            .units()
            .into_iter()
            .filter(|id| items::is_consumable(id))
            .collect();
        let fighter = character.with_equipment(Equipment {
            items: pack,
            ..character.equipment.clone()
        });

        let combat = Combat::start(encounter, fighter, &campaign.bestiary)?
            .roll_initiative(rng)?
            .advance(rng)?;
        let resolved = combat.is_resolved();
        self.combat = Some(combat);
        if resolved {
            self.finish_combat(campaign, rng)
        } else {
            Ok(self)
        }
    }

    fn finish_combat(
        mut self,
        campaign: &Campaign,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let result = self
            .combat
            .take()
            .and_then(|combat| combat.result())
            .ok_or_else(|| DomainError::InvalidState("combat is not over".to_owned()))?;

        let mut step = self
            .narrative
            .clone()
            .resume_after_combat(&campaign.graph, &result)?;
        if result.outcome == CombatOutcome::Defeat {
            step.character = step.character.map(|c| {
                let hp = c.hp.max(1);
                c.with_hp(hp)
            });
        }
        let mut session = self.absorb(step);
        session.request_checkpoint(CheckpointReason::CombatFinished);
        info!(
            session = %session.id,
            outcome = ?result.outcome,
            xp = result.xp_gained,
            gold = result.gold_gained,
            "combat finished"
        );
        session.settle(campaign, rng)
    }

    fn explore(
        mut self,
        table_id: &str,
        campaign: &Campaign,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let table = campaign
            .table(table_id)
            .ok_or_else(|| DomainError::unknown("event table", table_id))?;
        let drawn = roll_camp_event(table, &self.narrative.world, self.character.as_ref(), rng);

        if let Some(event) = drawn {
            self.pending_event = Some(PendingEvent {
                table_id: table.id.clone(),
                event_id: event.id.clone(),
                purpose: EventPurpose::Exploration,
            });
            self.note(event.description.clone());
            return Ok(self);
        }

        let step = self
            .narrative
            .clone()
            .resume_after_exploration(&[], self.character.clone())?;
        let mut session = self.absorb(step);
        session.note("You search but find nothing of note.".to_owned());
        session.settle(campaign, rng)
    }

    fn complete_rest(mut self) -> Self {
        if let Some(character) = &self.character {
            self.character = Some(camp::rest(character));
        }
        self.note("You rest and wake refreshed.".to_owned());
        self.request_checkpoint(CheckpointReason::RestCompleted);
        info!(session = %self.id, "rest completed");
        self
    }

    /// Takes a narrative step's output. A character seen for the first time
    /// hands its starting kit to the world inventory, which owns items
    /// from then on. Any pack the character comes back with is dropped.
    fn absorb(mut self, step: Step) -> Self {
        self.narrative = step.narrative;
        match step.character {
            Some(character) if self.character.is_none() => {
                let world = character
                    .equipment
                    .items
                    .iter()
                    .fold(self.narrative.world.clone(), |world, item| {
                        world.give_item(item)
                    });
                self.narrative.world = world;
                self.character = Some(without_pack(character));
                debug!(session = %self.id, "starting kit moved to inventory");
                self.request_checkpoint(CheckpointReason::CharacterCreated);
            }
            other => self.character = other.map(without_pack),
        }
        self
    }

    fn request_checkpoint(&mut self, reason: CheckpointReason) {
        self.checkpoint = Some(reason);
    }

    fn note(&mut self, text: String) {
        let node_id = self.narrative.current_node_id().map(str::to_owned);
        let conversation = std::mem::take(&mut self.narrative.conversation);
        self.narrative.conversation = conversation.noting(node_id.as_deref(), text);
    }

    fn require_character(&self) -> Result<&Character, DomainError> {
        self.character
            .as_ref()
            .ok_or_else(|| DomainError::InvalidState("no character has been created".to_owned()))
    }

    fn expect_story(&self) -> Result<(), DomainError> {
        match self.screen() {
            Screen::Story => Ok(()),
            other => Err(DomainError::InvalidState(format!(
                "the session is on the {other:?} screen"
            ))),
        }
    }
}

/// The world inventory owns consumables; a character only carries them
/// for the length of a fight.
fn without_pack(character: Character) -> Character {
    if character.equipment.items.is_empty() {
        return character;
    }
    character.with_equipment(Equipment {
        items: Vec::new(),
        ..character.equipment.clone()
    })
}
