//! The story graph.

use std::collections::BTreeMap;

use emberfall_core::error::DomainError;

use super::schema::{Choice, StoryNode};

/// Nodes keyed by id, plus the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryGraph {
    start_node_id: String,
    nodes: BTreeMap<String, StoryNode>,
}

impl StoryGraph {
    /// Builds a graph. A repeated node id replaces the earlier node.
    #[must_use]
    pub fn new(start_node_id: &str, nodes: impl IntoIterator<Item = StoryNode>) -> Self {
        Self {
            start_node_id: start_node_id.to_owned(),
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    /// Where a new campaign begins.
    #[must_use]
    pub fn start_node_id(&self) -> &str {
        &self.start_node_id
    }

    /// Looks up a node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] for an unknown id.
    pub fn node(&self, node_id: &str) -> Result<&StoryNode, DomainError> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| DomainError::NodeNotFound(node_id.to_owned()))
    }

    /// Looks up a choice on a node.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NodeNotFound`] or
    /// [`DomainError::ChoiceNotFound`].
    pub fn choice(&self, node_id: &str, choice_id: &str) -> Result<&Choice, DomainError> {
        self.node(node_id)?
            .choice(choice_id)
            .ok_or_else(|| DomainError::ChoiceNotFound {
                node_id: node_id.to_owned(),
                choice_id: choice_id.to_owned(),
            })
    }

    /// Whether `node_id` exists.
    #[must_use]
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &StoryNode> {
        self.nodes.values()
    }
}
