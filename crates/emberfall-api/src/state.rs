//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use emberfall_content::domain::Campaign;
use emberfall_core::clock::Clock;
use emberfall_core::rng::DeterministicRng;
use emberfall_core::storage::KeyValueStore;
use emberfall_session::application::command_handlers::{self, SessionContext};
use emberfall_session::domain::{CheckpointReason, EngineConfig, GameSession};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// One live session behind its own lock.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// Sessions currently held in memory, by id.
pub type SessionMap = HashMap<Uuid, SharedSession>;

/// Dice shared by every session. Locked per draw, never across an await.
pub type SharedRng = Arc<std::sync::Mutex<dyn DeterministicRng>>;

/// Application state shared across all request handlers.
///
/// The `sessions` map lock is only held to look up, insert or remove an
/// entry. Commands run under the per-session lock.
#[derive(Clone)]
pub struct AppState {
    /// The campaign being served.
    pub campaign: Arc<Campaign>,
    /// Session settings.
    pub config: Arc<EngineConfig>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Dice source shared by every session.
    pub rng: SharedRng,
    /// Save slot storage.
    pub store: Arc<dyn KeyValueStore>,
    /// Live sessions.
    pub sessions: Arc<Mutex<SessionMap>>,
}

impl AppState {
    /// Create new application state with no live sessions.
    #[must_use]
    pub fn new(
        campaign: Arc<Campaign>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        rng: SharedRng,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            campaign,
            config: Arc::new(config),
            clock,
            rng,
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Borrows the pieces the session handlers need.
    #[must_use]
    pub fn context(&self) -> SessionContext<'_> {
        SessionContext {
            campaign: &self.campaign,
            config: &self.config,
            clock: self.clock.as_ref(),
            store: self.store.as_ref(),
        }
    }

    /// A handle on the shared dice for one command.
    #[must_use]
    pub fn dice(&self) -> SharedDice {
        SharedDice(Arc::clone(&self.rng))
    }

    /// The live session `id`, if it is in memory.
    pub async fn live(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Makes `session` live. If another request loaded the same session
    /// first, that copy wins and is returned.
    pub async fn adopt(&self, session: GameSession) -> SharedSession {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(
            sessions
                .entry(session.id)
                .or_insert_with(|| Arc::new(Mutex::new(session))),
        )
    }

    /// Drops session `id` from memory.
    pub async fn forget(&self, id: Uuid) {
        self.sessions.lock().await.remove(&id);
    }

    /// Removes every session idle for longer than `max_idle_seconds` at
    /// `now` and returns them. Sessions a request is holding stay.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> Vec<GameSession> {
        let max_idle = self.config.max_idle_seconds;
        let mut sessions = self.sessions.lock().await;
        let mut evicted = Vec::new();
        sessions.retain(|_, shared| {
            if Arc::strong_count(shared) > 1 {
                return true;
            }
            let Ok(session) = shared.try_lock() else {
                return true;
            };
            let idle = u64::try_from((now - session.last_played_at).num_seconds()).unwrap_or(0);
            if idle > max_idle {
                evicted.push(session.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Checkpoints and unloads idle sessions. A session whose save fails
    /// goes back into memory.
    pub async fn unload_idle(&self) {
        let evicted = self.evict_idle(self.clock.now()).await;
        if evicted.is_empty() {
            return;
        }
        let ctx = self.context();
        for session in evicted {
            if command_handlers::checkpoint(&session, CheckpointReason::Unloaded, &ctx).await {
                debug!(session = %session.id, "idle session unloaded");
            } else {
                info!(session = %session.id, "idle session kept after failed save");
                self.adopt(session).await;
            }
        }
    }
}

/// Draws from the shared dice one roll at a time.
pub struct SharedDice(SharedRng);

impl DeterministicRng for SharedDice {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u32_range(min, max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_f64()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use emberfall_content::domain::DocumentFormat;
    use emberfall_test_support::{FailingStore, FixedClock, InMemoryStore, MockRng};

    use super::*;

    const ASHFALL: &str = include_str!("../../../campaigns/ashfall.yaml");

    fn started_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn state_over(store: Arc<dyn KeyValueStore>) -> AppState {
        let campaign = Arc::new(Campaign::compile(ASHFALL, DocumentFormat::Yaml).unwrap());
        let rng: SharedRng = Arc::new(std::sync::Mutex::new(MockRng));
        AppState::new(
            campaign,
            EngineConfig::default(),
            Arc::new(FixedClock(started_at())),
            rng,
            store,
        )
    }

    fn fresh_session(state: &AppState) -> GameSession {
        GameSession::new(
            Uuid::new_v4(),
            &state.campaign,
            &state.config,
            started_at(),
            &mut MockRng,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recent_sessions() {
        let state = state_over(Arc::new(InMemoryStore::new()));
        let session = fresh_session(&state);
        let id = session.id;
        state.adopt(session).await;

        let evicted = state.evict_idle(started_at() + Duration::seconds(300)).await;

        assert!(evicted.is_empty());
        assert!(state.live(id).await.is_some());
    }

    #[tokio::test]
    async fn test_evict_idle_removes_sessions_past_the_limit() {
        // Arrange
        let state = state_over(Arc::new(InMemoryStore::new()));
        let session = fresh_session(&state);
        let id = session.id;
        state.adopt(session).await;

        // Act
        let evicted = state.evict_idle(started_at() + Duration::seconds(301)).await;

        // Assert
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, id);
        assert!(state.live(id).await.is_none());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_sessions_in_use() {
        let state = state_over(Arc::new(InMemoryStore::new()));
        let held = state.adopt(fresh_session(&state)).await;
        let _guard = held.lock().await;

        let evicted = state.evict_idle(started_at() + Duration::hours(1)).await;

        assert!(evicted.is_empty());
        assert_eq!(state.sessions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_adopt_keeps_the_first_copy() {
        let state = state_over(Arc::new(InMemoryStore::new()));
        let first = fresh_session(&state);
        let mut second = first.clone();
        second.play_time_seconds = 99;

        state.adopt(first).await;
        let live = state.adopt(second).await;

        assert_eq!(live.lock().await.play_time_seconds, 0);
    }

    #[tokio::test]
    async fn test_unload_idle_saves_then_resumes() {
        // Arrange
        let state = state_over(Arc::new(InMemoryStore::new()));
        let mut session = fresh_session(&state);
        session.last_played_at = started_at() - Duration::hours(1);
        let id = session.id;
        state.adopt(session).await;

        // Act
        state.unload_idle().await;

        // Assert
        assert!(state.live(id).await.is_none());
        let resumed = command_handlers::handle_resume(id, &state.context()).await;
        assert_eq!(resumed.map(|s| s.id), Some(id));
    }

    #[tokio::test]
    async fn test_unload_idle_keeps_session_when_save_fails() {
        let state = state_over(Arc::new(FailingStore));
        let mut session = fresh_session(&state);
        session.last_played_at = started_at() - Duration::hours(1);
        let id = session.id;
        state.adopt(session).await;

        state.unload_idle().await;

        assert!(state.live(id).await.is_some());
    }

    #[test]
    fn test_shared_dice_draw_from_the_shared_source() {
        let state = state_over(Arc::new(InMemoryStore::new()));
        let mut dice = state.dice();

        assert_eq!(dice.next_u32_range(1, 20), 1);
        assert!(dice.next_f64().abs() < f64::EPSILON);
    }
}
