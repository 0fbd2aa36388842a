//! Choice and event requirements.

use emberfall_character::domain::{Ability, Character, CharacterClass, StatBlock};
use emberfall_world_state::domain::{FlagValue, WorldState};
use serde::{Deserialize, Serialize};

/// A predicate over the world record and the character.
///
/// Requirements that inspect the character fail when there is none yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Requirement {
    /// Flag equals `value`; an unset flag equals `false`.
    Flag {
        /// Flag name.
        flag: String,
        /// Expected value.
        value: FlagValue,
    },
    /// Flag is set to a truthy value.
    FlagSet {
        /// Flag name.
        flag: String,
    },
    /// Flag is unset or falsy.
    FlagUnset {
        /// Flag name.
        flag: String,
    },
    /// Numeric flag is at least `value`.
    FlagAtLeast {
        /// Flag name.
        flag: String,
        /// Minimum.
        value: i64,
    },
    /// At least one of the item is carried.
    HasItem {
        /// Item id.
        item_id: String,
    },
    /// The item is not carried.
    LacksItem {
        /// Item id.
        item_id: String,
    },
    /// Character class matches.
    Class {
        /// Required class.
        class: CharacterClass,
    },
    /// Character level is at least `level`.
    MinLevel {
        /// Minimum level.
        level: u32,
    },
    /// Ability score is at least `score`.
    MinAbility {
        /// Ability checked.
        ability: Ability,
        /// Minimum score.
        score: i32,
    },
    /// Purse holds at least `amount`.
    MinGold {
        /// Minimum gold.
        amount: u32,
    },
    /// Node has been entered before.
    Visited {
        /// Node id.
        node_id: String,
    },
    /// Node has never been entered.
    NotVisited {
        /// Node id.
        node_id: String,
    },
    /// Location is unlocked on the world map.
    LocationUnlocked {
        /// Location id.
        location_id: String,
    },
}

impl Requirement {
    /// Evaluates the requirement.
    #[must_use]
    pub fn is_met(&self, world: &WorldState, character: Option<&Character>) -> bool {
        match self {
            Self::Flag { flag, value } => {
                world.flag(flag).unwrap_or(FlagValue::Bool(false)) == *value
            }
            Self::FlagSet { flag } => world.is_flag_set(flag),
            Self::FlagUnset { flag } => !world.is_flag_set(flag),
            Self::FlagAtLeast { flag, value } => world.number_flag(flag) >= *value,
            Self::HasItem { item_id } => world.inventory.has(item_id),
            Self::LacksItem { item_id } => !world.inventory.has(item_id),
            Self::Class { class } => character.is_some_and(|c| c.class == *class),
            Self::MinLevel { level } => character.is_some_and(|c| c.level >= *level),
            Self::MinAbility { ability, score } => {
                character.is_some_and(|c| c.abilities().score(*ability) >= *score)
            }
            Self::MinGold { amount } => world.inventory.gold >= *amount,
            Self::Visited { node_id } => world.has_visited(node_id),
            Self::NotVisited { node_id } => !world.has_visited(node_id),
            Self::LocationUnlocked { location_id } => world.can_travel_to_location(location_id),
        }
    }
}

/// Whether every requirement holds. An empty list always holds.
#[must_use]
pub fn all_met(
    requirements: &[Requirement],
    world: &WorldState,
    character: Option<&Character>,
) -> bool {
    requirements.iter().all(|r| r.is_met(world, character))
}
