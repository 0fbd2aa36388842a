//! The narrative state machine.
//!
//! `Inactive -> Active(node) -> Inactive`, with `Suspended(trigger)`
//! whenever control passes to combat, a merchant, character creation,
//! exploration or a level-up. Every operation consumes the current
//! [`Narrative`] and returns the next one alongside the character.

use emberfall_character::domain::Character;
use emberfall_combat::domain::{CombatOutcome, CombatResult, EncounterSpec};
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_rules::domain::checks::skill_check;
use emberfall_world_state::domain::{Shop, TradeFailure, WorldState};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::conversation::ConversationState;
use super::effects::{Effect, apply_effects};
use super::graph::StoryGraph;
use super::requirements::all_met;
use super::schema::{Choice, Outcome};

/// Why the narrative handed control away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Trigger {
    /// A fight.
    Combat(EncounterSpec),
    /// A merchant screen.
    Merchant(Shop),
    /// Character creation.
    CharacterCreation {
        /// Creation step to open.
        phase: String,
        /// Node entered once the character exists.
        next_node_id: String,
    },
    /// An exploration roll.
    Exploration {
        /// Event table id.
        table_id: String,
        /// Whether the table is used up afterwards.
        once_only: bool,
    },
    /// A level-up screen.
    LevelUp {
        /// Level reached.
        new_level: u32,
        /// Feats granted at the new level.
        feat_choices: Vec<String>,
    },
}

/// Where the narrative is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NarrativeState {
    /// No conversation is running.
    #[default]
    Inactive,
    /// Waiting for a choice on `node_id`.
    Active {
        /// Current node.
        node_id: String,
    },
    /// Waiting for an external collaborator.
    Suspended {
        /// Node to return to; `None` when suspended outside a conversation.
        node_id: Option<String>,
        /// What was handed over.
        trigger: Trigger,
    },
}

/// A merchant action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TradeAction {
    /// Buy one unit.
    Buy {
        /// Item id.
        item_id: String,
    },
    /// Sell one unit.
    Sell {
        /// Item id.
        item_id: String,
    },
}

/// The narrative state plus the world it writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    /// State machine position.
    #[serde(default)]
    pub state: NarrativeState,
    /// World record.
    pub world: WorldState,
    /// Conversation log.
    #[serde(default)]
    pub conversation: ConversationState,
}

/// Output of a narrative transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Next narrative snapshot.
    pub narrative: Narrative,
    /// Character after any effects.
    pub character: Option<Character>,
}

impl Narrative {
    /// An inactive narrative over `world`.
    #[must_use]
    pub fn new(world: WorldState) -> Self {
        Self {
            state: NarrativeState::Inactive,
            world,
            conversation: ConversationState::default(),
        }
    }

    /// Reassembles a loaded narrative.
    ///
    /// A missing state is derived from the world's current node and a
    /// missing conversation is rebuilt from the graph.
    #[must_use]
    pub fn restore(
        world: WorldState,
        conversation: Option<ConversationState>,
        state: Option<NarrativeState>,
        graph: &StoryGraph,
    ) -> Self {
        let conversation =
            conversation.unwrap_or_else(|| ConversationState::rebuild(&world, graph));
        let state = state.unwrap_or_else(|| match &world.current_node_id {
            Some(node_id) if graph.contains(node_id) => NarrativeState::Active {
                node_id: node_id.clone(),
            },
            _ => NarrativeState::Inactive,
        });
        Self {
            state,
            world,
            conversation,
        }
    }

    /// Node the narrative is on or will return to.
    #[must_use]
    pub fn current_node_id(&self) -> Option<&str> {
        match &self.state {
            NarrativeState::Inactive => None,
            NarrativeState::Active { node_id } => Some(node_id),
            NarrativeState::Suspended { node_id, .. } => node_id.as_deref(),
        }
    }

    /// The pending trigger while suspended.
    #[must_use]
    pub fn trigger(&self) -> Option<&Trigger> {
        match &self.state {
            NarrativeState::Suspended { trigger, .. } => Some(trigger),
            _ => None,
        }
    }

    /// Enters the graph's start node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] if the start node is missing.
    pub fn start(
        self,
        graph: &StoryGraph,
        character: Option<Character>,
    ) -> Result<Step, DomainError> {
        self.enter_node(graph, graph.start_node_id(), character)
    }

    /// Enters a node: narrates it, runs its `onEnter` effects, marks it
    /// visited, and moves the party to its location when that location is
    /// unlocked.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] for an unknown id.
    #[instrument(skip(self, graph, character))]
    pub fn enter_node(
        self,
        graph: &StoryGraph,
        node_id: &str,
        character: Option<Character>,
    ) -> Result<Step, DomainError> {
        let node = graph.node(node_id)?;
        let conversation = self.conversation.narrating(node);

        let applied = apply_effects(&node.on_enter, &self.world, character.as_ref());
        let mut world = applied.world.entering_node(node_id);
        if let Some(location_id) = &node.location_id {
            if let Ok(moved) = world.travel_to(location_id) {
                world = moved;
            }
        }

        let state = match applied.trigger {
            Some(trigger) => NarrativeState::Suspended {
                node_id: Some(node_id.to_owned()),
                trigger,
            },
            None => NarrativeState::Active {
                node_id: node_id.to_owned(),
            },
        };
        info!(node = node_id, suspended = matches!(state, NarrativeState::Suspended { .. }), "entered node");
        Ok(Step {
            narrative: Self {
                state,
                world,
                conversation,
            },
            character: applied.character,
        })
    }

    /// Choices on the current node whose requirements all hold. Empty
    /// unless the narrative is active.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] if the current node vanished
    /// from the graph.
    pub fn available_choices<'g>(
        &self,
        graph: &'g StoryGraph,
        character: Option<&Character>,
    ) -> Result<Vec<&'g Choice>, DomainError> {
        let NarrativeState::Active { node_id } = &self.state else {
            return Ok(Vec::new());
        };
        Ok(graph
            .node(node_id)?
            .choices
            .iter()
            .filter(|c| all_met(&c.requirements, &self.world, character))
            .collect())
    }

    /// Selects a choice on the current node and resolves its outcome.
    ///
    /// Hidden choices cannot be selected.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless active,
    /// [`DomainError::ChoiceNotFound`] for an unknown or hidden choice,
    /// and [`DomainError::NodeNotFound`] for a dangling `goto`.
    #[instrument(skip(self, graph, character, rng))]
    pub fn select_choice(
        self,
        graph: &StoryGraph,
        choice_id: &str,
        character: Option<Character>,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Step, DomainError> {
        let NarrativeState::Active { node_id } = &self.state else {
            return Err(DomainError::InvalidState(
                "no conversation is waiting for a choice".to_owned(),
            ));
        };
        let node_id = node_id.clone();
        let choice = graph.choice(&node_id, choice_id)?;
        if !all_met(&choice.requirements, &self.world, character.as_ref()) {
            return Err(DomainError::ChoiceNotFound {
                node_id,
                choice_id: choice_id.to_owned(),
            });
        }

        let next = Self {
            conversation: self.conversation.choosing(&node_id, choice),
            ..self
        };
        next.resolve_outcome(graph, &node_id, &choice.outcome, character, rng)
    }

    fn resolve_outcome(
        self,
        graph: &StoryGraph,
        node_id: &str,
        outcome: &Outcome,
        character: Option<Character>,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Step, DomainError> {
        let suspend = |narrative: Self, trigger: Trigger, character: Option<Character>| Step {
            narrative: Self {
                state: NarrativeState::Suspended {
                    node_id: Some(node_id.to_owned()),
                    trigger,
                },
                ..narrative
            },
            character,
        };

        match outcome {
            Outcome::Goto { node_id: target } => self.enter_node(graph, target, character),
            Outcome::Check {
                skill,
                dc,
                success,
                failure,
            } => {
                let Some(hero) = character.as_ref() else {
                    return Err(DomainError::InvalidState(
                        "a skill check needs a character".to_owned(),
                    ));
                };
                let check = skill_check(hero, *skill, *dc, rng);
                let verdict = if check.success { "success" } else { "failure" };
                let note = format!(
                    "{} check: {} vs DC {}, {verdict}.",
                    skill.display_name(),
                    check.total,
                    check.dc
                );
                let next = Self {
                    conversation: self.conversation.noting(Some(node_id), note),
                    ..self
                };
                let branch = if check.success { success } else { failure };
                next.resolve_outcome(graph, node_id, branch, character, rng)
            }
            Outcome::Exit => {
                info!(node = node_id, "conversation ended");
                Ok(Step {
                    narrative: Self {
                        state: NarrativeState::Inactive,
                        world: self.world.leaving_narrative(),
                        conversation: self.conversation,
                    },
                    character,
                })
            }
            Outcome::Loop => Ok(Step {
                narrative: self,
                character,
            }),
            Outcome::StartCombat(encounter) => {
                Ok(suspend(self, Trigger::Combat(encounter.clone()), character))
            }
            Outcome::Merchant(shop) => Ok(suspend(self, Trigger::Merchant(shop.clone()), character)),
            Outcome::CharacterCreation {
                phase,
                next_node_id,
            } => Ok(suspend(
                self,
                Trigger::CharacterCreation {
                    phase: phase.clone(),
                    next_node_id: next_node_id.clone(),
                },
                character,
            )),
            Outcome::Explore {
                table_id,
                once_only,
            } => {
                if *once_only && self.world.has_explored(table_id) {
                    let next = Self {
                        conversation: self
                            .conversation
                            .noting(Some(node_id), "There is nothing more to find here.".to_owned()),
                        ..self
                    };
                    return Ok(Step {
                        narrative: next,
                        character,
                    });
                }
                Ok(suspend(
                    self,
                    Trigger::Exploration {
                        table_id: table_id.clone(),
                        once_only: *once_only,
                    },
                    character,
                ))
            }
        }
    }

    /// Applies effects outside a node's `onEnter`, such as camp event
    /// results. A combat or level-up trigger suspends the narrative.
    #[must_use]
    pub fn apply(self, effects: &[Effect], character: Option<Character>) -> Step {
        let applied = apply_effects(effects, &self.world, character.as_ref());
        let state = match applied.trigger {
            Some(trigger) => NarrativeState::Suspended {
                node_id: self.current_node_id().map(str::to_owned),
                trigger,
            },
            None => self.state,
        };
        Step {
            narrative: Self {
                state,
                world: applied.world,
                conversation: self.conversation,
            },
            character: applied.character,
        }
    }

    /// Suspends the narrative for a fight started outside a conversation.
    #[must_use]
    pub fn suspend_for(self, trigger: Trigger) -> Self {
        Self {
            state: NarrativeState::Suspended {
                node_id: self.current_node_id().map(str::to_owned),
                trigger,
            },
            ..self
        }
    }

    /// Folds a finished fight back in: rewards and penalties reach the
    /// world, spent consumables leave the inventory, and the encounter's
    /// follow-up node is entered. Without a follow-up node a defeat ends
    /// the conversation and any other outcome returns to the node the
    /// fight started from.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless suspended for combat
    /// and [`DomainError::NodeNotFound`] for a dangling follow-up node.
    #[instrument(skip_all, fields(outcome = ?result.outcome))]
    pub fn resume_after_combat(
        self,
        graph: &StoryGraph,
        result: &CombatResult,
    ) -> Result<Step, DomainError> {
        let return_to = self.expect_trigger("combat", |t| matches!(t, Trigger::Combat(_)))?;

        let mut world = self
            .world
            .give_gold(result.gold_gained)
            .lose_gold(result.gold_penalty);
        for item_id in &result.items_used {
            world = world.remove_item(item_id);
        }
        let summary = match result.outcome {
            CombatOutcome::Victory => format!("You defeated the {}.", result.enemy.name),
            CombatOutcome::Defeat => format!("The {} has beaten you.", result.enemy.name),
            CombatOutcome::Fled => format!("You escaped the {}.", result.enemy.name),
        };
        let resumed = Self {
            state: NarrativeState::Inactive,
            world,
            conversation: self.conversation.noting(return_to.as_deref(), summary),
        };
        let character = Some(result.player.clone());

        if let Some(next) = &result.next_node_id {
            return resumed.enter_node(graph, next, character);
        }
        let state = match (result.outcome, return_to) {
            (CombatOutcome::Defeat, _) | (_, None) => NarrativeState::Inactive,
            (_, Some(node_id)) => NarrativeState::Active { node_id },
        };
        let world = if state == NarrativeState::Inactive {
            resumed.world.leaving_narrative()
        } else {
            resumed.world
        };
        Ok(Step {
            narrative: Self {
                state,
                world,
                conversation: resumed.conversation,
            },
            character,
        })
    }

    /// Buys or sells one unit at the open merchant. A refused trade is
    /// narrated and returned alongside the unchanged narrative.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a merchant is open.
    pub fn trade(self, action: &TradeAction) -> Result<(Self, Option<TradeFailure>), DomainError> {
        let Some(Trigger::Merchant(shop)) = self.trigger() else {
            return Err(DomainError::InvalidState("no merchant is open".to_owned()));
        };
        let node_id = self.current_node_id().map(str::to_owned);
        let (traded, note) = match action {
            TradeAction::Buy { item_id } => (shop.buy(&self.world, item_id), format!("Bought {item_id}.")),
            TradeAction::Sell { item_id } => {
                (shop.sell(&self.world, item_id), format!("Sold {item_id}."))
            }
        };
        match traded {
            Ok(world) => Ok((
                Self {
                    world,
                    conversation: self.conversation.noting(node_id.as_deref(), note),
                    ..self
                },
                None,
            )),
            Err(failure) => {
                warn!(?action, %failure, "trade refused");
                Ok((
                    Self {
                        conversation: self
                            .conversation
                            .noting(node_id.as_deref(), failure.to_string()),
                        ..self
                    },
                    Some(failure),
                ))
            }
        }
    }

    /// Closes the merchant and returns to the node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless a merchant is open.
    pub fn resume_after_merchant(self) -> Result<Self, DomainError> {
        let return_to = self.expect_trigger("merchant", |t| matches!(t, Trigger::Merchant(_)))?;
        Ok(self.returning_to(return_to))
    }

    /// Enters the node that follows character creation with the new
    /// character.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless suspended for creation
    /// and [`DomainError::NodeNotFound`] for a dangling next node.
    pub fn resume_after_character_creation(
        self,
        graph: &StoryGraph,
        character: Character,
    ) -> Result<Step, DomainError> {
        let Some(Trigger::CharacterCreation { next_node_id, .. }) = self.trigger() else {
            return Err(DomainError::InvalidState(
                "narrative is not waiting for character creation".to_owned(),
            ));
        };
        let next_node_id = next_node_id.clone();
        self.enter_node(graph, &next_node_id, Some(character))
    }

    /// Applies an exploration result and returns to the node, marking a
    /// once-only table explored. A combat effect suspends again.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless suspended for
    /// exploration.
    pub fn resume_after_exploration(
        self,
        effects: &[Effect],
        character: Option<Character>,
    ) -> Result<Step, DomainError> {
        let Some(Trigger::Exploration {
            table_id,
            once_only,
        }) = self.trigger()
        else {
            return Err(DomainError::InvalidState(
                "narrative is not waiting for exploration".to_owned(),
            ));
        };
        let world = if *once_only {
            self.world.mark_explored(table_id)
        } else {
            self.world.clone()
        };
        let return_to = self.current_node_id().map(str::to_owned);
        let resumed = Self {
            world,
            ..self
        }
        .returning_to(return_to);
        Ok(resumed.apply(effects, character))
    }

    /// Returns to the node once the level-up screen is done.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidState`] unless suspended for a
    /// level-up.
    pub fn resume_after_level_up(self) -> Result<Self, DomainError> {
        let return_to =
            self.expect_trigger("level-up", |t| matches!(t, Trigger::LevelUp { .. }))?;
        Ok(self.returning_to(return_to))
    }

    fn expect_trigger(
        &self,
        what: &str,
        matches: impl Fn(&Trigger) -> bool,
    ) -> Result<Option<String>, DomainError> {
        match &self.state {
            NarrativeState::Suspended { node_id, trigger } if matches(trigger) => {
                Ok(node_id.clone())
            }
            _ => Err(DomainError::InvalidState(format!(
                "narrative is not waiting for {what}"
            ))),
        }
    }

    fn returning_to(self, node_id: Option<String>) -> Self {
        match node_id {
            Some(node_id) => Self {
                state: NarrativeState::Active { node_id },
                ..self
            },
            None => Self {
                state: NarrativeState::Inactive,
                ..self
            },
        }
    }
}
