//! Domain error types.

use thiserror::Error;

use crate::dice::DiceError;

/// Top-level domain error type.
///
/// Every variant is fatal for the operation that raised it: these signal
/// bad content or a caller driving a state machine out of order. Expected
/// gameplay failures (a missed attack, a depleted resource) are modelled as
/// ordinary return values instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A story node id referenced by content or a caller does not exist.
    #[error("story node not found: {0}")]
    NodeNotFound(String),

    /// A choice id does not exist on the current node.
    #[error("choice {choice_id} not found on node {node_id}")]
    ChoiceNotFound {
        /// The node that was searched.
        node_id: String,
        /// The missing choice.
        choice_id: String,
    },

    /// A catalog lookup (creature, feat, spell, item, table) failed.
    #[error("unknown {kind}: {id}")]
    UnknownReference {
        /// What kind of catalog entry was referenced.
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// A dice notation string could not be parsed.
    #[error(transparent)]
    Dice(#[from] DiceError),

    /// An operation was invoked in a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for an [`DomainError::UnknownReference`].
    #[must_use]
    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_not_found_message_names_node_and_choice() {
        let err = DomainError::ChoiceNotFound {
            node_id: "gate".to_owned(),
            choice_id: "bribe".to_owned(),
        };

        assert_eq!(err.to_string(), "choice bribe not found on node gate");
    }

    #[test]
    fn test_dice_error_converts_transparently() {
        let err: DomainError = DiceError::MalformedNotation("3x6".to_owned()).into();

        assert_eq!(err.to_string(), "malformed dice notation: 3x6");
    }

    #[test]
    fn test_unknown_helper_builds_reference_error() {
        let err = DomainError::unknown("creature", "wyvern");

        assert_eq!(err.to_string(), "unknown creature: wyvern");
    }
}
