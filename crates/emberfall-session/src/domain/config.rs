//! Per-session engine settings.

use uuid::Uuid;

/// Prefix for save slot keys when none is configured.
pub const DEFAULT_SLOT_PREFIX: &str = "emberfall:save:";

/// Longest gap between two commands that still counts as play time.
pub const DEFAULT_MAX_IDLE_SECONDS: u64 = 300;

/// Settings that shape a new session and where it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Overrides the campaign's starting location.
    pub starting_location: Option<String>,
    /// Prefix prepended to the session id to form the save key.
    pub slot_prefix: String,
    /// Idle gaps longer than this are not counted as play time.
    pub max_idle_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_location: None,
            slot_prefix: DEFAULT_SLOT_PREFIX.to_owned(),
            max_idle_seconds: DEFAULT_MAX_IDLE_SECONDS,
        }
    }
}

impl EngineConfig {
    /// The key-value store key for a session.
    #[must_use]
    pub fn slot_key(&self, session_id: Uuid) -> String {
        format!("{}{session_id}", self.slot_prefix)
    }

    /// The location a new game starts in.
    #[must_use]
    pub fn starting_location<'a>(&'a self, campaign_default: &'a str) -> &'a str {
        self.starting_location.as_deref().unwrap_or(campaign_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_key_prefixes_session_id() {
        let id = Uuid::nil();

        let key = EngineConfig::default().slot_key(id);

        assert_eq!(key, "emberfall:save:00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_starting_location_override_wins() {
        let config = EngineConfig {
            starting_location: Some("old_mine".to_owned()),
            ..EngineConfig::default()
        };

        assert_eq!(config.starting_location("ember_village"), "old_mine");
        assert_eq!(
            EngineConfig::default().starting_location("ember_village"),
            "ember_village"
        );
    }
}
