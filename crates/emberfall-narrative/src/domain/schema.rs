//! Story content schema.

use emberfall_character::domain::Skill;
use emberfall_combat::domain::EncounterSpec;
use emberfall_world_state::domain::Shop;
use serde::{Deserialize, Serialize};

use super::effects::Effect;
use super::requirements::Requirement;

/// One story beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryNode {
    /// Unique id within the campaign.
    pub id: String,
    /// Narration appended to the conversation on entry.
    pub description: String,
    /// World-map location the node takes place at.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Who is speaking.
    #[serde(default)]
    pub speaker_name: Option<String>,
    /// Companion aside logged after the narration.
    #[serde(default)]
    pub companion_hint: Option<String>,
    /// Effects run, in order, every time the node is entered.
    #[serde(default)]
    pub on_enter: Vec<Effect>,
    /// Choices in display order.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl StoryNode {
    /// Finds a choice by id.
    #[must_use]
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// A selectable option on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Unique id within the node.
    pub id: String,
    /// Button text.
    pub text: String,
    /// All must hold for the choice to be shown.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// What selecting the choice does.
    pub outcome: Outcome,
}

/// What a choice leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    /// Enter another node.
    Goto {
        /// Target node.
        node_id: String,
    },
    /// Roll a skill check and follow the matching branch.
    Check {
        /// Skill rolled.
        skill: Skill,
        /// Difficulty class.
        dc: i32,
        /// Branch taken on success.
        success: Box<Outcome>,
        /// Branch taken on failure.
        failure: Box<Outcome>,
    },
    /// End the conversation.
    Exit,
    /// Present the current node again without rerunning its effects.
    Loop,
    /// Hand over to the combat engine.
    StartCombat(EncounterSpec),
    /// Open a merchant.
    Merchant(Shop),
    /// Hand over to character creation, then enter `next_node_id`.
    CharacterCreation {
        /// Creation step to open, as understood by the front end.
        phase: String,
        /// Node entered once the character exists.
        next_node_id: String,
    },
    /// Roll on an exploration table.
    Explore {
        /// Event table id.
        table_id: String,
        /// Whether the table can only be explored once.
        #[serde(default)]
        once_only: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_wire_format() {
        let json = r#"{
            "id": "gate",
            "description": "A goblin blocks the gate.",
            "speakerName": "Guard",
            "choices": [
                {"id": "fight", "text": "Fight", "outcome": {
                    "type": "startCombat", "enemyId": "goblin", "onVictoryNodeId": "courtyard"
                }},
                {"id": "sneak", "text": "Sneak past", "outcome": {
                    "type": "check", "skill": "stealth", "dc": 12,
                    "success": {"type": "goto", "nodeId": "courtyard"},
                    "failure": {"type": "loop"}
                }},
                {"id": "shop", "text": "Trade", "outcome": {
                    "type": "merchant", "shopInventory": ["rope"], "buyPrices": {"rope": 2}
                }},
                {"id": "leave", "text": "Leave", "outcome": {"type": "exit"}}
            ]
        }"#;

        let node: StoryNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.speaker_name.as_deref(), Some("Guard"));
        assert!(node.on_enter.is_empty());
        assert!(matches!(
            &node.choice("fight").unwrap().outcome,
            Outcome::StartCombat(spec) if spec.enemy_id == "goblin"
                && spec.on_victory_node_id.as_deref() == Some("courtyard")
        ));
        assert!(matches!(
            &node.choice("sneak").unwrap().outcome,
            Outcome::Check { skill: Skill::Stealth, dc: 12, .. }
        ));
        assert!(matches!(
            &node.choice("shop").unwrap().outcome,
            Outcome::Merchant(shop) if shop.buy_prices["rope"] == 2
        ));
        assert_eq!(node.choice("leave").unwrap().outcome, Outcome::Exit);
        assert!(node.choice("swim").is_none());
    }
}
