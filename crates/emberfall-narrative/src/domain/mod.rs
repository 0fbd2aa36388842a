//! Domain model for the Narrative context.

pub mod camp;
pub mod conversation;
pub mod effects;
pub mod engine;
pub mod graph;
pub mod requirements;
pub mod schema;

pub use camp::{CampChoice, CampEvent, CampEventTable, CampOutcome, CampResolution};
pub use conversation::{ConversationEntry, ConversationState, EntryKind};
pub use effects::{AppliedEffects, Effect, HealAmount};
pub use engine::{Narrative, NarrativeState, Step, TradeAction, Trigger};
pub use graph::StoryGraph;
pub use requirements::Requirement;
pub use schema::{Choice, Outcome, StoryNode};
