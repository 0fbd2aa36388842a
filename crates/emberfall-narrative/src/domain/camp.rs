//! Camp and exploration event tables.
//!
//! A roll first passes a d100 gate against the table's `rollChance`, then
//! draws one eligible event by cumulative weight.

use emberfall_character::domain::{Character, StatBlock, resources};
use emberfall_combat::domain::EncounterSpec;
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_world_state::domain::WorldState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::effects::Effect;
use super::requirements::{Requirement, all_met};

/// Chance, in percent, that resting at camp draws an event.
pub const DEFAULT_CAMP_EVENT_CHANCE: u32 = 30;

fn default_chance() -> u32 {
    DEFAULT_CAMP_EVENT_CHANCE
}

fn default_weight() -> u32 {
    1
}

/// How a camp choice plays out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CampOutcome {
    /// The rest goes ahead, after any effects.
    Continue {
        /// Effects applied before resting.
        #[serde(default)]
        effects: Vec<Effect>,
    },
    /// The rest is cut short.
    Interrupt {
        /// Effects applied instead of resting.
        #[serde(default)]
        effects: Vec<Effect>,
    },
    /// A fight breaks out.
    Combat(EncounterSpec),
}

/// A selectable response to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampChoice {
    /// Unique id within the event.
    pub id: String,
    /// Button text.
    pub text: String,
    /// All must hold for the choice to be shown.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Resolution.
    pub outcome: CampOutcome,
}

/// A weighted random event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampEvent {
    /// Unique id within the table.
    pub id: String,
    /// Narration.
    pub description: String,
    /// Relative draw weight; 0 never draws.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// All must hold for the event to be drawn.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Responses.
    #[serde(default)]
    pub choices: Vec<CampChoice>,
}

/// Events for a location or exploration site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampEventTable {
    /// Table id.
    pub id: String,
    /// Location the table applies to when resting.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Percentage chance that a roll draws an event at all.
    #[serde(default = "default_chance")]
    pub roll_chance: u32,
    /// Candidate events.
    #[serde(default)]
    pub events: Vec<CampEvent>,
}

/// What a resolved camp choice means for the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampResolution {
    /// Whether the long rest still happens.
    pub continue_rest: bool,
    /// Fight to start, if any.
    pub combat_triggered: Option<EncounterSpec>,
    /// Effects to apply.
    pub effects: Vec<Effect>,
}

impl CampEvent {
    /// Choices whose requirements all hold.
    #[must_use]
    pub fn available_choices(
        &self,
        world: &WorldState,
        character: Option<&Character>,
    ) -> Vec<&CampChoice> {
        self.choices
            .iter()
            .filter(|c| all_met(&c.requirements, world, character))
            .collect()
    }

    /// Resolves an available choice.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ChoiceNotFound`] for an unknown or hidden
    /// choice.
    pub fn resolve(
        &self,
        choice_id: &str,
        world: &WorldState,
        character: Option<&Character>,
    ) -> Result<CampResolution, DomainError> {
        let choice = self
            .available_choices(world, character)
            .into_iter()
            .find(|c| c.id == choice_id)
            .ok_or_else(|| DomainError::ChoiceNotFound {
                node_id: self.id.clone(),
                choice_id: choice_id.to_owned(),
            })?;
        Ok(match &choice.outcome {
            CampOutcome::Continue { effects } => CampResolution {
                continue_rest: true,
                combat_triggered: None,
                effects: effects.clone(),
            },
            CampOutcome::Interrupt { effects } => CampResolution {
                continue_rest: false,
                combat_triggered: None,
                effects: effects.clone(),
            },
            CampOutcome::Combat(encounter) => CampResolution {
                continue_rest: false,
                combat_triggered: Some(encounter.clone()),
                effects: Vec::new(),
            },
        })
    }
}

/// Rolls for an event on `table`.
///
/// Returns `None` when the gate roll fails or nothing eligible remains.
pub fn roll_camp_event<'t>(
    table: &'t CampEventTable,
    world: &WorldState,
    character: Option<&Character>,
    rng: &mut dyn DeterministicRng,
) -> Option<&'t CampEvent> {
    let gate = rng.next_u32_range(1, 100);
    if gate > table.roll_chance {
        debug!(table = %table.id, gate, chance = table.roll_chance, "no camp event");
        return None;
    }

    let eligible: Vec<&CampEvent> = table
        .events
        .iter()
        .filter(|e| e.weight > 0 && all_met(&e.requirements, world, character))
        .collect();
    let total = eligible
        .iter()
        .fold(0u32, |total, e| total.saturating_add(e.weight));
    if total == 0 {
        return None;
    }

    let mut draw = rng.next_u32_range(1, total);
    for event in eligible {
        if draw <= event.weight {
            info!(table = %table.id, event = %event.id, "camp event drawn");
            return Some(event);
        }
        draw -= event.weight;
    }
    None
}

/// A long rest: full hit points and every limited resource restored.
#[must_use]
pub fn rest(character: &Character) -> Character {
    let rested = resources::restore(character);
    rested.heal(rested.max_hp)
}
