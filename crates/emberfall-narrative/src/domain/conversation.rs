//! The conversation log shown beside the story.

use std::collections::BTreeSet;

use emberfall_world_state::domain::WorldState;
use serde::{Deserialize, Serialize};

use super::graph::StoryGraph;
use super::schema::{Choice, StoryNode};

/// What produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    /// Node narration or a narrated result.
    Narrative,
    /// A choice the player made.
    Choice,
    /// A companion's aside.
    CompanionHint,
}

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    /// Entry kind.
    pub kind: EntryKind,
    /// Text.
    pub text: String,
    /// Speaker, for narration.
    #[serde(default)]
    pub speaker: Option<String>,
    /// Node the entry belongs to.
    #[serde(default)]
    pub node_id: Option<String>,
}

/// Ephemeral log plus the choices already taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Entries in order.
    #[serde(default)]
    pub entries: Vec<ConversationEntry>,
    /// `node/choice` keys already selected.
    #[serde(default)]
    pub seen_choices: BTreeSet<String>,
}

impl ConversationState {
    /// Rebuilds a log for a save that did not carry one: the current node's
    /// narration and hint, and nothing else.
    #[must_use]
    pub fn rebuild(world: &WorldState, graph: &StoryGraph) -> Self {
        let node = world
            .current_node_id
            .as_deref()
            .and_then(|id| graph.node(id).ok());
        match node {
            Some(node) => Self::default().narrating(node),
            None => Self::default(),
        }
    }

    /// Appends a node's narration and companion hint.
    #[must_use]
    pub fn narrating(mut self, node: &StoryNode) -> Self {
        self.entries.push(ConversationEntry {
            kind: EntryKind::Narrative,
            text: node.description.clone(),
            speaker: node.speaker_name.clone(),
            node_id: Some(node.id.clone()),
        });
        if let Some(hint) = &node.companion_hint {
            self.entries.push(ConversationEntry {
                kind: EntryKind::CompanionHint,
                text: hint.clone(),
                speaker: None,
                node_id: Some(node.id.clone()),
            });
        }
        self
    }

    /// Appends the player's choice and marks it seen.
    #[must_use]
    pub fn choosing(mut self, node_id: &str, choice: &Choice) -> Self {
        self.entries.push(ConversationEntry {
            kind: EntryKind::Choice,
            text: choice.text.clone(),
            speaker: None,
            node_id: Some(node_id.to_owned()),
        });
        self.seen_choices.insert(seen_key(node_id, &choice.id));
        self
    }

    /// Appends a narrated result such as a skill check.
    #[must_use]
    pub fn noting(mut self, node_id: Option<&str>, text: String) -> Self {
        self.entries.push(ConversationEntry {
            kind: EntryKind::Narrative,
            text,
            speaker: None,
            node_id: node_id.map(str::to_owned),
        });
        self
    }

    /// Whether a choice has been taken before.
    #[must_use]
    pub fn has_seen(&self, node_id: &str, choice_id: &str) -> bool {
        self.seen_choices.contains(&seen_key(node_id, choice_id))
    }
}

fn seen_key(node_id: &str, choice_id: &str) -> String {
    format!("{node_id}/{choice_id}")
}
