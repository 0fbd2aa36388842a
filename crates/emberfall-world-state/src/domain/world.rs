//! The persisted world record.
//!
//! Every operation returns a new [`WorldState`]; the narrative engine is
//! the only writer. Node, location, sanctuary and table collections are
//! sets, so repeating a visit or unlock never duplicates an entry.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::flags::FlagValue;
use super::inventory::Inventory;

/// Why travel was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelFailure {
    /// The destination has not been unlocked.
    #[error("{0} is not reachable yet")]
    LocationLocked(String),
}

/// Story flags, progress, inventory and the world map for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    /// Campaign this record belongs to.
    pub campaign_id: String,
    /// Current act, if the campaign uses acts.
    #[serde(default)]
    pub current_act_id: Option<String>,
    /// Node the narrative is on.
    #[serde(default)]
    pub current_node_id: Option<String>,
    /// Story flags.
    #[serde(default)]
    pub flags: BTreeMap<String, FlagValue>,
    /// Every node entered at least once.
    #[serde(default)]
    pub visited_nodes: BTreeSet<String>,
    /// Items and gold.
    #[serde(default)]
    pub inventory: Inventory,
    /// Where the party is on the world map.
    #[serde(default)]
    pub current_location_id: Option<String>,
    /// Locations the party may travel to.
    #[serde(default)]
    pub unlocked_locations: BTreeSet<String>,
    /// Locations the party has been to.
    #[serde(default)]
    pub visited_locations: BTreeSet<String>,
    /// Sanctuaries available for safe rests.
    #[serde(default)]
    pub unlocked_sanctuaries: BTreeSet<String>,
    /// Once-only exploration tables already used.
    #[serde(default)]
    pub explored_tables: BTreeSet<String>,
}

impl WorldState {
    /// An empty record for `campaign_id`.
    #[must_use]
    pub fn new(campaign_id: &str) -> Self {
        Self {
            campaign_id: campaign_id.to_owned(),
            ..Self::default()
        }
    }

    /// A fresh campaign standing at `starting_location`, which is the only
    /// unlocked location.
    #[must_use]
    pub fn start_campaign(campaign_id: &str, starting_location: &str) -> Self {
        let here = BTreeSet::from([starting_location.to_owned()]);
        Self {
            current_location_id: Some(starting_location.to_owned()),
            unlocked_locations: here.clone(),
            visited_locations: here,
            ..Self::new(campaign_id)
        }
    }

    /// A flag's value, if set.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<FlagValue> {
        self.flags.get(name).copied()
    }

    /// Whether `name` is set to a truthy value.
    #[must_use]
    pub fn is_flag_set(&self, name: &str) -> bool {
        self.flag(name).is_some_and(FlagValue::is_truthy)
    }

    /// Numeric value of `name`; unset flags count as 0.
    #[must_use]
    pub fn number_flag(&self, name: &str) -> i64 {
        self.flag(name).map_or(0, FlagValue::as_number)
    }

    /// Returns a copy with `name` set to `value`.
    #[must_use]
    pub fn with_flag(&self, name: &str, value: FlagValue) -> Self {
        let mut next = self.clone();
        next.flags.insert(name.to_owned(), value);
        next
    }

    /// Returns a copy with `delta` added to the numeric value of `name`.
    #[must_use]
    pub fn adjust_flag(&self, name: &str, delta: i64) -> Self {
        let value = self.number_flag(name).saturating_add(delta);
        self.with_flag(name, FlagValue::Number(value))
    }

    /// Whether `node_id` has been entered before.
    #[must_use]
    pub fn has_visited(&self, node_id: &str) -> bool {
        self.visited_nodes.contains(node_id)
    }

    /// Returns a copy positioned on `node_id`, which is marked visited.
    #[must_use]
    pub fn entering_node(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.current_node_id = Some(node_id.to_owned());
        next.visited_nodes.insert(node_id.to_owned());
        next
    }

    /// Returns a copy with no current node.
    #[must_use]
    pub fn leaving_narrative(&self) -> Self {
        Self {
            current_node_id: None,
            ..self.clone()
        }
    }

    /// Returns a copy with `inventory` swapped in.
    #[must_use]
    pub fn with_inventory(&self, inventory: Inventory) -> Self {
        Self {
            inventory,
            ..self.clone()
        }
    }

    /// Returns a copy carrying one more `item_id`.
    #[must_use]
    pub fn give_item(&self, item_id: &str) -> Self {
        self.with_inventory(self.inventory.with_item(item_id, 1))
    }

    /// Returns a copy carrying one fewer `item_id`; unchanged if none is
    /// carried.
    #[must_use]
    pub fn remove_item(&self, item_id: &str) -> Self {
        self.inventory
            .without_item(item_id, 1)
            .map_or_else(|| self.clone(), |inventory| self.with_inventory(inventory))
    }

    /// Returns a copy with `amount` more gold.
    #[must_use]
    pub fn give_gold(&self, amount: u32) -> Self {
        self.with_inventory(self.inventory.with_gold_added(amount))
    }

    /// Returns a copy with up to `amount` gold lost.
    #[must_use]
    pub fn lose_gold(&self, amount: u32) -> Self {
        self.with_inventory(self.inventory.losing_gold(amount))
    }

    /// `true` iff `location_id` is unlocked.
    #[must_use]
    pub fn can_travel_to_location(&self, location_id: &str) -> bool {
        self.unlocked_locations.contains(location_id)
    }

    /// Returns a copy with `location_id` unlocked.
    #[must_use]
    pub fn unlock_location(&self, location_id: &str) -> Self {
        let mut next = self.clone();
        next.unlocked_locations.insert(location_id.to_owned());
        next
    }

    /// Moves the party to an unlocked location and marks it visited.
    ///
    /// # Errors
    ///
    /// Returns [`TravelFailure::LocationLocked`] if the location is not
    /// unlocked.
    pub fn travel_to(&self, location_id: &str) -> Result<Self, TravelFailure> {
        if !self.can_travel_to_location(location_id) {
            return Err(TravelFailure::LocationLocked(location_id.to_owned()));
        }
        let mut next = self.clone();
        next.current_location_id = Some(location_id.to_owned());
        next.visited_locations.insert(location_id.to_owned());
        debug!(location = location_id, "travelled");
        Ok(next)
    }

    /// Returns a copy with `sanctuary_id` unlocked.
    #[must_use]
    pub fn unlock_sanctuary(&self, sanctuary_id: &str) -> Self {
        let mut next = self.clone();
        next.unlocked_sanctuaries.insert(sanctuary_id.to_owned());
        next
    }

    /// Whether the party is resting at an unlocked sanctuary.
    #[must_use]
    pub fn at_sanctuary(&self) -> bool {
        self.current_location_id
            .as_ref()
            .is_some_and(|here| self.unlocked_sanctuaries.contains(here))
    }

    /// Whether a once-only table has been used.
    #[must_use]
    pub fn has_explored(&self, table_id: &str) -> bool {
        self.explored_tables.contains(table_id)
    }

    /// Returns a copy with `table_id` marked explored.
    #[must_use]
    pub fn mark_explored(&self, table_id: &str) -> Self {
        let mut next = self.clone();
        next.explored_tables.insert(table_id.to_owned());
        next
    }
}
