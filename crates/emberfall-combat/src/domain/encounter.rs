//! Encounter definitions carried by story content.

use serde::{Deserialize, Serialize};

/// Gold lost on retreat when content does not say otherwise.
pub const DEFAULT_RETREAT_GOLD_PENALTY: u32 = 10;

/// HP lost on retreat when content does not say otherwise.
pub const DEFAULT_RETREAT_HP_PENALTY: i32 = 2;

/// What fleeing costs and where it leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetreatPenalty {
    /// Gold dropped while fleeing.
    #[serde(default = "default_gold")]
    pub gold: u32,
    /// Hit points lost while fleeing. Retreat never drops the character
    /// below 1 HP.
    #[serde(default = "default_hp")]
    pub hp: i32,
    /// Story node entered after a successful retreat.
    pub safe_node_id: String,
}

fn default_gold() -> u32 {
    DEFAULT_RETREAT_GOLD_PENALTY
}

fn default_hp() -> i32 {
    DEFAULT_RETREAT_HP_PENALTY
}

/// One fight, as declared by a `startCombat` outcome or effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSpec {
    /// Bestiary id of the opponent.
    pub enemy_id: String,
    /// Node entered on victory.
    #[serde(default)]
    pub on_victory_node_id: Option<String>,
    /// Node entered on defeat.
    #[serde(default)]
    pub on_defeat_node_id: Option<String>,
    /// Retreat terms; `None` means the fight cannot be fled.
    #[serde(default)]
    pub retreat: Option<RetreatPenalty>,
}

impl EncounterSpec {
    /// A fight against `enemy_id` with no retreat and no follow-up nodes.
    #[must_use]
    pub fn new(enemy_id: &str) -> Self {
        Self {
            enemy_id: enemy_id.to_owned(),
            on_victory_node_id: None,
            on_defeat_node_id: None,
            retreat: None,
        }
    }

    /// Whether the player may flee.
    #[must_use]
    pub fn allows_retreat(&self) -> bool {
        self.retreat.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retreat_penalty_defaults_apply() {
        let spec: EncounterSpec = serde_json::from_value(serde_json::json!({
            "enemyId": "wolf",
            "onVictoryNodeId": "clearing",
            "retreat": { "safeNodeId": "road" }
        }))
        .unwrap();

        let retreat = spec.retreat.clone().unwrap();
        assert!(spec.allows_retreat());
        assert_eq!(retreat.gold, DEFAULT_RETREAT_GOLD_PENALTY);
        assert_eq!(retreat.hp, DEFAULT_RETREAT_HP_PENALTY);
        assert_eq!(spec.on_defeat_node_id, None);
    }

    #[test]
    fn test_minimal_spec_forbids_retreat() {
        let spec: EncounterSpec =
            serde_json::from_value(serde_json::json!({ "enemyId": "ogre" })).unwrap();
        assert_eq!(spec, EncounterSpec::new("ogre"));
        assert!(!spec.allows_retreat());
    }
}
