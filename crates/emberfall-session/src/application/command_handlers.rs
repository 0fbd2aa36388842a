//! Command handlers for the Session & Progress context.
//!
//! Each handler advances a [`GameSession`] and, when the session asks for
//! one, writes a checkpoint. Checkpoints are fire-and-forget: a failed save
//! is logged and the in-memory session carries on.

use emberfall_content::domain::Campaign;
use emberfall_core::clock::Clock;
use emberfall_core::error::DomainError;
use emberfall_core::rng::DeterministicRng;
use emberfall_core::storage::KeyValueStore;
use emberfall_world_state::domain::TradeFailure;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::{
    ConfirmLevelUp, CreateCharacter, ResolveEvent, SelectChoice, TakeCombatAction, Trade,
};
use crate::domain::config::EngineConfig;
use crate::domain::save::SaveRecord;
use crate::domain::session::{CheckpointReason, GameSession};

/// Everything a handler needs besides the session and the dice.
#[derive(Clone, Copy)]
pub struct SessionContext<'a> {
    /// The campaign being played.
    pub campaign: &'a Campaign,
    /// Session settings.
    pub config: &'a EngineConfig,
    /// Time source.
    pub clock: &'a dyn Clock,
    /// Save slot storage.
    pub store: &'a dyn KeyValueStore,
}

/// Writes `session` to its save slot. Returns whether the save landed.
#[instrument(skip_all, fields(session = %session.id, ?reason))]
pub async fn checkpoint(
    session: &GameSession,
    reason: CheckpointReason,
    ctx: &SessionContext<'_>,
) -> bool {
    let key = ctx.config.slot_key(session.id);
    let saved = match session.to_record(ctx.clock.now()).encode() {
        Ok(value) => ctx.store.save(&key, &value).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match saved {
        Ok(()) => {
            info!(%key, "checkpoint saved");
            true
        }
        Err(error) => {
            warn!(%key, %error, "checkpoint failed, continuing unsaved");
            false
        }
    }
}

fn touched(mut session: GameSession, ctx: &SessionContext<'_>) -> GameSession {
    session.record_activity(ctx.clock.now(), ctx.config.max_idle_seconds);
    session
}

async fn persisted(mut session: GameSession, ctx: &SessionContext<'_>) -> GameSession {
    if let Some(reason) = session.take_checkpoint() {
        checkpoint(&session, reason, ctx).await;
    }
    session
}

/// Starts a new game with a fresh session id.
///
/// # Errors
///
/// Returns `DomainError` if the campaign's start node cannot be entered.
#[instrument(skip_all, fields(campaign = %ctx.campaign.id))]
pub async fn handle_new_game(
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = GameSession::new(
        Uuid::new_v4(),
        ctx.campaign,
        ctx.config,
        ctx.clock.now(),
        rng,
    )?;
    Ok(persisted(session, ctx).await)
}

/// Loads a saved session.
///
/// A missing, unreadable or foreign save is reported as `None`.
#[instrument(skip(ctx))]
pub async fn handle_resume(session_id: Uuid, ctx: &SessionContext<'_>) -> Option<GameSession> {
    let key = ctx.config.slot_key(session_id);
    let value = match ctx.store.load(&key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(error) => {
            warn!(%key, %error, "save could not be loaded");
            return None;
        }
    };
    let restored = SaveRecord::decode(value)
        .and_then(|record| GameSession::from_record(session_id, record, ctx.campaign));
    match restored {
        Ok(session) => {
            info!(%key, screen = ?session.screen(), "session resumed");
            Some(session)
        }
        Err(error) => {
            warn!(%key, %error, "save discarded");
            None
        }
    }
}

/// Deletes a session's save slot.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the store rejects the delete.
#[instrument(skip(ctx))]
pub async fn handle_abandon(session_id: Uuid, ctx: &SessionContext<'_>) -> Result<(), DomainError> {
    ctx.store.delete(&ctx.config.slot_key(session_id)).await
}

/// Handles [`SelectChoice`].
///
/// # Errors
///
/// Returns `DomainError` when the session is not on a story node, the
/// choice is unknown or hidden, or content is broken.
#[instrument(skip_all, fields(session = %session.id, choice = %command.choice_id))]
pub async fn handle_select_choice(
    session: GameSession,
    command: &SelectChoice,
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).select_choice(ctx.campaign, &command.choice_id, rng)?;
    Ok(persisted(session, ctx).await)
}

/// Handles [`CreateCharacter`].
///
/// # Errors
///
/// Returns `DomainError::Validation` for unacceptable input and
/// `DomainError::InvalidState` outside character creation.
#[instrument(skip_all, fields(session = %session.id, class = ?command.class))]
pub async fn handle_create_character(
    session: GameSession,
    command: &CreateCharacter,
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).create_character(
        ctx.campaign,
        &command.name,
        command.class,
        command.abilities,
        rng,
    )?;
    Ok(persisted(session, ctx).await)
}

/// Handles [`TakeCombatAction`].
///
/// # Errors
///
/// Returns `DomainError::InvalidState` when no fight is in progress.
#[instrument(skip_all, fields(session = %session.id, action = ?command.action))]
pub async fn handle_combat_action(
    session: GameSession,
    command: &TakeCombatAction,
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).combat_action(ctx.campaign, &command.action, rng)?;
    Ok(persisted(session, ctx).await)
}

/// Handles a rest request.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` unless the session is on a story
/// node with a character.
#[instrument(skip_all, fields(session = %session.id))]
pub async fn handle_rest(
    session: GameSession,
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).rest(ctx.campaign, rng)?;
    Ok(persisted(session, ctx).await)
}

/// Handles [`ResolveEvent`].
///
/// # Errors
///
/// Returns `DomainError` when no event is pending or the choice is not
/// available.
#[instrument(skip_all, fields(session = %session.id, choice = %command.choice_id))]
pub async fn handle_resolve_event(
    session: GameSession,
    command: &ResolveEvent,
    ctx: &SessionContext<'_>,
    rng: &mut dyn DeterministicRng,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).resolve_event(ctx.campaign, &command.choice_id, rng)?;
    Ok(persisted(session, ctx).await)
}

/// Handles [`ConfirmLevelUp`].
///
/// # Errors
///
/// Returns `DomainError` when no level-up is pending or a chosen feat is
/// unknown or unavailable.
#[instrument(skip_all, fields(session = %session.id))]
pub async fn handle_level_up(
    session: GameSession,
    command: &ConfirmLevelUp,
    ctx: &SessionContext<'_>,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).confirm_level_up(command.feat_choices.as_deref())?;
    Ok(persisted(session, ctx).await)
}

/// Handles [`Trade`]. A refused trade is returned alongside the session.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` unless a merchant is open.
#[instrument(skip_all, fields(session = %session.id, action = ?command.action))]
pub async fn handle_trade(
    session: GameSession,
    command: &Trade,
    ctx: &SessionContext<'_>,
) -> Result<(GameSession, Option<TradeFailure>), DomainError> {
    let (session, failure) = touched(session, ctx).trade(&command.action)?;
    Ok((persisted(session, ctx).await, failure))
}

/// Closes the open merchant.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` unless a merchant is open.
#[instrument(skip_all, fields(session = %session.id))]
pub async fn handle_leave_merchant(
    session: GameSession,
    ctx: &SessionContext<'_>,
) -> Result<GameSession, DomainError> {
    let session = touched(session, ctx).leave_merchant()?;
    Ok(persisted(session, ctx).await)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use emberfall_combat::domain::PlayerAction;
    use emberfall_content::domain::DocumentFormat;
    use emberfall_test_support::{FailingStore, FixedClock, InMemoryStore, MockRng};
    use serde_json::json;

    use super::*;
    use crate::domain::save::CURRENT_SAVE_VERSION;
    use crate::domain::session::Screen;

    const CAMPAIGN: &str = r"
id: crossing
title: The Crossing
startNodeId: bank
startingLocation: river
nodes:
  - id: bank
    description: A ferry waits at the river bank.
    onEnter:
      - type: createDefaultCharacter
    choices:
      - id: board
        text: Board the ferry
        outcome:
          type: goto
          nodeId: far_bank
      - id: linger
        text: Linger
        outcome:
          type: loop
  - id: far_bank
    description: The far bank is quiet.
    choices:
      - id: done
        text: Walk on
        outcome:
          type: exit
";

    fn campaign() -> Campaign {
        Campaign::compile(CAMPAIGN, DocumentFormat::Yaml).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 9, 12, 0, 0).unwrap()
    }

    fn select(choice_id: &str) -> SelectChoice {
        SelectChoice {
            choice_id: choice_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_handle_new_game_writes_checkpoint() {
        // Arrange
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };

        // Act
        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();

        // Assert
        let saved = store.get(&config.slot_key(session.id)).unwrap();
        assert_eq!(saved["version"], json!(CURRENT_SAVE_VERSION));
        assert_eq!(saved["narrative"]["campaignId"], json!("crossing"));
        assert_eq!(saved["metadata"]["characterName"], json!("Wanderer"));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_checkpoint_keeps_in_memory_progress() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &FailingStore,
        };

        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();
        let session = handle_select_choice(session, &select("board"), &ctx, &mut MockRng)
            .await
            .unwrap();

        assert_eq!(session.narrative.current_node_id(), Some("far_bank"));
    }

    #[tokio::test]
    async fn test_loop_choice_does_not_save() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };
        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();

        handle_select_choice(session, &select("linger"), &ctx, &mut MockRng)
            .await
            .unwrap();

        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_resume_restores_saved_session() {
        // Arrange
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };
        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();
        let session = handle_select_choice(session, &select("board"), &ctx, &mut MockRng)
            .await
            .unwrap();

        // Act
        let resumed = handle_resume(session.id, &ctx).await.unwrap();

        // Assert
        assert_eq!(resumed.narrative, session.narrative);
        assert_eq!(resumed.character, session.character);
        assert_eq!(resumed.screen(), Screen::Story);
    }

    #[tokio::test]
    async fn test_handle_resume_treats_corrupted_save_as_missing() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.insert(&config.slot_key(id), json!({ "version": 2, "garbage": true }));
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };

        assert!(handle_resume(id, &ctx).await.is_none());
        assert!(handle_resume(Uuid::new_v4(), &ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_handle_resume_with_failing_store_is_none() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &FailingStore,
        };

        assert!(handle_resume(Uuid::new_v4(), &ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_handle_abandon_clears_slot() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };
        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();

        handle_abandon(session.id, &ctx).await.unwrap();

        assert!(store.get(&config.slot_key(session.id)).is_none());
    }

    #[tokio::test]
    async fn test_combat_action_outside_combat_is_rejected() {
        let campaign = campaign();
        let config = EngineConfig::default();
        let clock = FixedClock(fixed_now());
        let store = InMemoryStore::new();
        let ctx = SessionContext {
            campaign: &campaign,
            config: &config,
            clock: &clock,
            store: &store,
        };
        let session = handle_new_game(&ctx, &mut MockRng).await.unwrap();
        let command = TakeCombatAction {
            action: PlayerAction::Attack,
        };

        let err = handle_combat_action(session, &command, &ctx, &mut MockRng)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidState(_)));
    }
}
