//! Domain model for the Session & Progress context.

pub mod commands;
pub mod config;
pub mod migrations;
pub mod save;
pub mod session;

pub use config::EngineConfig;
pub use save::{CURRENT_SAVE_VERSION, NarrativeSnapshot, SaveError, SaveMetadata, SaveRecord};
pub use session::{CheckpointReason, EventPurpose, GameSession, PendingEvent, Screen};
