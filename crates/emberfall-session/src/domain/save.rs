//! The versioned save record.

use chrono::{DateTime, Utc};
use emberfall_character::domain::Character;
use emberfall_combat::domain::Combat;
use emberfall_narrative::domain::{ConversationState, NarrativeState};
use emberfall_world_state::domain::WorldState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::migrations;
use super::session::{PendingEvent, Screen};

/// Version written by this build.
pub const CURRENT_SAVE_VERSION: u32 = 3;

/// Why a stored value could not be turned into a [`SaveRecord`].
///
/// Callers treat every variant as "no save".
#[derive(Debug, Error)]
pub enum SaveError {
    /// The value is not a save record of any known shape.
    #[error("corrupted save: {0}")]
    Corrupted(String),

    /// Written by a newer build.
    #[error("unsupported save version {0} (newest known is {CURRENT_SAVE_VERSION})")]
    UnsupportedVersion(u64),

    /// Saved by a different campaign than the one loaded.
    #[error("save belongs to campaign {found}, expected {expected}")]
    CampaignMismatch {
        /// Campaign the server is running.
        expected: String,
        /// Campaign named in the save.
        found: String,
    },
}

impl From<serde_json::Error> for SaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Narrative half of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeSnapshot {
    /// World record.
    pub world: WorldState,
    /// Conversation log; rebuilt from the graph when absent.
    #[serde(default)]
    pub conversation: Option<ConversationState>,
    /// Campaign the save belongs to.
    pub campaign_id: String,
    /// Narrative state machine position; derived from the world when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NarrativeState>,
}

/// Summary shown on a load screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    /// Empty until a character exists.
    pub character_name: String,
    /// Zero until a character exists.
    pub character_level: u32,
    /// When the session last handled a command.
    pub last_played_timestamp: DateTime<Utc>,
    /// Accumulated play time.
    pub play_time_seconds: u64,
}

/// One save slot's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    /// Schema version.
    pub version: u32,
    /// When the record was written.
    pub timestamp: DateTime<Utc>,
    /// The player character, once created.
    pub character: Option<Character>,
    /// Narrative and world.
    pub narrative: NarrativeSnapshot,
    /// Screen to reopen on load.
    pub current_screen: Screen,
    /// Load-screen summary.
    pub metadata: SaveMetadata,
    /// Fight in progress, for mid-combat saves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<Combat>,
    /// Camp or exploration event awaiting a choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_event: Option<PendingEvent>,
}

impl SaveRecord {
    /// Decodes a stored value, migrating older versions forward.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Corrupted`] for anything that is not a save
    /// record and [`SaveError::UnsupportedVersion`] for newer versions.
    pub fn decode(value: serde_json::Value) -> Result<Self, SaveError> {
        let migrated = migrations::migrate(value)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Encodes the record for the key-value store.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Corrupted`] if a field cannot be represented
    /// as JSON.
    pub fn encode(&self) -> Result<serde_json::Value, SaveError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use emberfall_character::domain::default_character;
    use serde_json::json;

    use super::*;

    fn record() -> SaveRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        SaveRecord {
            version: CURRENT_SAVE_VERSION,
            timestamp: at,
            character: Some(default_character()),
            narrative: NarrativeSnapshot {
                world: WorldState::start_campaign("ashfall", "ember_village"),
                conversation: None,
                campaign_id: "ashfall".to_owned(),
                state: Some(NarrativeState::Active {
                    node_id: "village_square".to_owned(),
                }),
            },
            current_screen: Screen::Story,
            metadata: SaveMetadata {
                character_name: "Wanderer".to_owned(),
                character_level: 1,
                last_played_timestamp: at,
                play_time_seconds: 42,
            },
            combat: None,
            pending_event: None,
        }
    }

    #[test]
    fn test_encode_then_decode_preserves_record() {
        let saved = record();

        let loaded = SaveRecord::decode(saved.encode().unwrap()).unwrap();

        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_encoded_record_uses_wire_names() {
        let value = record().encode().unwrap();

        assert_eq!(value["version"], json!(3));
        assert_eq!(value["currentScreen"], json!("story"));
        assert_eq!(value["narrative"]["campaignId"], json!("ashfall"));
        assert_eq!(value["metadata"]["characterName"], json!("Wanderer"));
        assert_eq!(value["metadata"]["playTimeSeconds"], json!(42));
        assert!(value.get("combat").is_none());
    }

    #[test]
    fn test_garbage_is_corrupted() {
        let err = SaveRecord::decode(json!("not a save")).unwrap_err();

        assert!(matches!(err, SaveError::Corrupted(_)));
    }

    #[test]
    fn test_current_version_with_missing_fields_is_corrupted() {
        let err = SaveRecord::decode(json!({ "version": 3, "timestamp": "2026-03-01T18:30:00Z" }))
            .unwrap_err();

        assert!(matches!(err, SaveError::Corrupted(_)));
    }
}
