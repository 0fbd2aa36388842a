//! Commands for the Session & Progress context.

use emberfall_character::domain::{AbilityScores, CharacterClass};
use emberfall_combat::domain::PlayerAction;
use emberfall_narrative::domain::TradeAction;

/// Select a choice on the current story node.
#[derive(Debug, Clone)]
pub struct SelectChoice {
    /// The choice to take.
    pub choice_id: String,
}

/// Finish character creation.
#[derive(Debug, Clone)]
pub struct CreateCharacter {
    /// Display name.
    pub name: String,
    /// Chosen class.
    pub class: CharacterClass,
    /// Rolled or bought ability scores.
    pub abilities: AbilityScores,
}

/// Take the player's turn in the current fight.
#[derive(Debug, Clone)]
pub struct TakeCombatAction {
    /// What the player does.
    pub action: PlayerAction,
}

/// Confirm a pending level-up.
#[derive(Debug, Clone, Default)]
pub struct ConfirmLevelUp {
    /// Replaces the feats offered by the story.
    pub feat_choices: Option<Vec<String>>,
}

/// Buy or sell one unit at the open merchant.
#[derive(Debug, Clone)]
pub struct Trade {
    /// The trade.
    pub action: TradeAction,
}

/// Answer a pending camp or exploration event.
#[derive(Debug, Clone)]
pub struct ResolveEvent {
    /// The event choice to take.
    pub choice_id: String,
}
