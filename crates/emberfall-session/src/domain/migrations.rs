//! Forward migrations for stored save records.
//!
//! Version 1 kept the world, conversation and campaign id at the top level
//! and stamped saves with epoch milliseconds. Version 2 nested those under
//! `narrative` and switched to RFC 3339 timestamps. Version 3 added the
//! load-screen `metadata` block.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::save::{CURRENT_SAVE_VERSION, SaveError};

/// Brings `value` up to [`CURRENT_SAVE_VERSION`].
///
/// # Errors
///
/// Returns [`SaveError::Corrupted`] when the value has no usable version or
/// a step cannot find the fields it moves, and
/// [`SaveError::UnsupportedVersion`] for versions newer than this build.
pub fn migrate(value: Value) -> Result<Value, SaveError> {
    let mut version = version_of(&value)?;
    if version > u64::from(CURRENT_SAVE_VERSION) {
        return Err(SaveError::UnsupportedVersion(version));
    }

    let mut value = value;
    while version < u64::from(CURRENT_SAVE_VERSION) {
        value = match version {
            1 => v1_to_v2(value)?,
            2 => v2_to_v3(value)?,
            other => {
                return Err(SaveError::Corrupted(format!(
                    "no migration from version {other}"
                )));
            }
        };
        version += 1;
        debug!(version, "save record migrated");
    }
    Ok(value)
}

fn version_of(value: &Value) -> Result<u64, SaveError> {
    value
        .get("version")
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
        .ok_or_else(|| SaveError::Corrupted("missing save version".to_owned()))
}

fn object(value: Value) -> Result<Map<String, Value>, SaveError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SaveError::Corrupted("save record is not an object".to_owned())),
    }
}

fn v1_to_v2(value: Value) -> Result<Value, SaveError> {
    let mut record = object(value)?;

    let world = record
        .remove("world")
        .ok_or_else(|| SaveError::Corrupted("v1 save has no world".to_owned()))?;
    let campaign_id = record
        .remove("campaignId")
        .or_else(|| world.get("campaignId").cloned())
        .ok_or_else(|| SaveError::Corrupted("v1 save has no campaign id".to_owned()))?;
    let conversation = record.remove("conversation").unwrap_or(Value::Null);
    record.insert(
        "narrative".to_owned(),
        json!({
            "world": world,
            "conversation": conversation,
            "campaignId": campaign_id,
        }),
    );

    if let Some(millis) = record.get("timestamp").and_then(Value::as_i64) {
        let stamp = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| SaveError::Corrupted(format!("timestamp out of range: {millis}")))?;
        record.insert("timestamp".to_owned(), Value::String(stamp.to_rfc3339()));
    }
    record
        .entry("currentScreen")
        .or_insert_with(|| Value::String("story".to_owned()));
    record.insert("version".to_owned(), json!(2));
    Ok(Value::Object(record))
}

fn v2_to_v3(value: Value) -> Result<Value, SaveError> {
    let mut record = object(value)?;

    let timestamp = record
        .get("timestamp")
        .cloned()
        .ok_or_else(|| SaveError::Corrupted("v2 save has no timestamp".to_owned()))?;
    let character = record.get("character").filter(|c| !c.is_null());
    let name = character
        .and_then(|c| c.get("name"))
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));
    let level = character
        .and_then(|c| c.get("level"))
        .cloned()
        .unwrap_or_else(|| json!(0));

    record.entry("metadata").or_insert_with(|| {
        json!({
            "characterName": name,
            "characterLevel": level,
            "lastPlayedTimestamp": timestamp,
            "playTimeSeconds": 0,
        })
    });
    record.insert("version".to_owned(), json!(3));
    Ok(Value::Object(record))
}

#[cfg(test)]
mod tests {
    use emberfall_character::domain::default_character;
    use emberfall_world_state::domain::WorldState;

    use super::*;
    use crate::domain::save::SaveRecord;
    use crate::domain::session::Screen;

    fn v1_save() -> Value {
        json!({
            "version": 1,
            "timestamp": 1_767_225_600_000_i64,
            "character": default_character(),
            "world": WorldState::start_campaign("ashfall", "ember_village"),
            "campaignId": "ashfall",
        })
    }

    #[test]
    fn test_v1_save_migrates_to_current() {
        // Arrange
        let stored = v1_save();

        // Act
        let record = SaveRecord::decode(stored).unwrap();

        // Assert
        assert_eq!(record.version, CURRENT_SAVE_VERSION);
        assert_eq!(record.narrative.campaign_id, "ashfall");
        assert!(record.narrative.conversation.is_none());
        assert_eq!(record.current_screen, Screen::Story);
        assert_eq!(record.timestamp.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(record.metadata.character_name, "Wanderer");
        assert_eq!(record.metadata.character_level, 1);
        assert_eq!(record.metadata.last_played_timestamp, record.timestamp);
        assert_eq!(record.metadata.play_time_seconds, 0);
    }

    #[test]
    fn test_v2_save_without_character_gets_empty_metadata() {
        let stored = json!({
            "version": 2,
            "timestamp": "2026-02-10T08:00:00Z",
            "character": null,
            "narrative": {
                "world": WorldState::start_campaign("ashfall", "ember_village"),
                "campaignId": "ashfall",
            },
            "currentScreen": "characterCreation",
        });

        let record = SaveRecord::decode(stored).unwrap();

        assert!(record.character.is_none());
        assert_eq!(record.metadata.character_name, "");
        assert_eq!(record.metadata.character_level, 0);
        assert_eq!(record.current_screen, Screen::CharacterCreation);
    }

    #[test]
    fn test_newer_version_is_unsupported() {
        let err = migrate(json!({ "version": 9 })).unwrap_err();

        assert!(matches!(err, SaveError::UnsupportedVersion(9)));
    }

    #[test]
    fn test_missing_version_is_corrupted() {
        let err = migrate(json!({ "character": null })).unwrap_err();

        assert!(matches!(err, SaveError::Corrupted(_)));
    }

    #[test]
    fn test_v1_without_world_is_corrupted() {
        let err = migrate(json!({ "version": 1, "timestamp": 0 })).unwrap_err();

        assert!(matches!(err, SaveError::Corrupted(_)));
    }

    #[test]
    fn test_current_version_passes_through() {
        let stored = json!({ "version": 3, "anything": true });

        assert_eq!(migrate(stored.clone()).unwrap(), stored);
    }
}
