//! Routes for the Session & Progress bounded context.
//!
//! Sessions live in memory between requests and are checkpointed to their
//! save slot by the session handlers. A session that is not in memory is
//! resumed from its slot on first use, and one left idle is unloaded. A
//! command runs under its session's own lock, so a slow save holds up
//! only that player. A command that fails leaves the previous session in
//! place.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use emberfall_character::domain::{AbilityScores, CharacterClass};
use emberfall_combat::domain::PlayerAction;
use emberfall_core::error::DomainError;
use emberfall_narrative::domain::TradeAction;
use emberfall_session::application::command_handlers;
use emberfall_session::application::query_handlers::{SessionView, session_view};
use emberfall_session::domain::GameSession;
use emberfall_session::domain::commands;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, SharedSession};

/// Request body for POST /{id}/choices and /{id}/events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRequest {
    /// The choice to take.
    pub choice_id: String,
}

/// Request body for POST /{id}/character.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    /// Display name.
    pub name: String,
    /// Chosen class.
    pub class: CharacterClass,
    /// Ability scores.
    pub abilities: AbilityScores,
}

/// Request body for POST /{id}/level-up.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpRequest {
    /// Replaces the feats offered by the story.
    #[serde(default)]
    pub feat_choices: Option<Vec<String>>,
}

/// Response body for POST /{id}/trade.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    /// The session after the trade.
    pub session: SessionView,
    /// Why the trade was refused, if it was.
    pub failure: Option<String>,
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError(DomainError::unknown("session", id.to_string()))
}

/// Returns the live session `id`, resuming it from its save slot if it
/// is not in memory. The map lock is not held while the slot loads.
async fn resident(state: &AppState, id: Uuid) -> Result<SharedSession, ApiError> {
    state.unload_idle().await;
    if let Some(shared) = state.live(id).await {
        return Ok(shared);
    }
    let session = command_handlers::handle_resume(id, &state.context())
        .await
        .ok_or_else(|| session_not_found(id))?;
    Ok(state.adopt(session).await)
}

/// Replaces the live copy with `next` and renders it.
fn commit(
    state: &AppState,
    live: &mut GameSession,
    next: GameSession,
) -> Result<SessionView, ApiError> {
    let view = session_view(&next, &state.campaign)?;
    *live = next;
    Ok(view)
}

/// POST /
#[instrument(skip(state))]
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    state.unload_idle().await;
    let session = command_handlers::handle_new_game(&state.context(), &mut state.dice()).await?;
    info!(session = %session.id, "session created");
    let view = session_view(&session, &state.campaign)?;
    state.adopt(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let session = shared.lock().await;
    Ok(Json(session_view(&session, &state.campaign)?))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.forget(id).await;
    command_handlers::handle_abandon(id, &state.context()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{id}/choices
#[instrument(skip(state, request), fields(choice = %request.choice_id))]
async fn select_choice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::SelectChoice {
        choice_id: request.choice_id,
    };
    let session = command_handlers::handle_select_choice(
        live.clone(),
        &command,
        &state.context(),
        &mut state.dice(),
    )
    .await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/character
#[instrument(skip(state, request), fields(class = ?request.class))]
async fn create_character(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCharacterRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::CreateCharacter {
        name: request.name,
        class: request.class,
        abilities: request.abilities,
    };
    let session = command_handlers::handle_create_character(
        live.clone(),
        &command,
        &state.context(),
        &mut state.dice(),
    )
    .await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/combat
#[instrument(skip(state, action))]
async fn combat_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<PlayerAction>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::TakeCombatAction { action };
    let session = command_handlers::handle_combat_action(
        live.clone(),
        &command,
        &state.context(),
        &mut state.dice(),
    )
    .await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/rest
#[instrument(skip(state))]
async fn rest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let session =
        command_handlers::handle_rest(live.clone(), &state.context(), &mut state.dice()).await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/events
#[instrument(skip(state, request), fields(choice = %request.choice_id))]
async fn resolve_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::ResolveEvent {
        choice_id: request.choice_id,
    };
    let session = command_handlers::handle_resolve_event(
        live.clone(),
        &command,
        &state.context(),
        &mut state.dice(),
    )
    .await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/level-up
#[instrument(skip(state, request))]
async fn level_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LevelUpRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::ConfirmLevelUp {
        feat_choices: request.feat_choices,
    };
    let session =
        command_handlers::handle_level_up(live.clone(), &command, &state.context()).await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// POST /{id}/trade
#[instrument(skip(state, action))]
async fn trade(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<TradeAction>,
) -> Result<Json<TradeResponse>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let command = commands::Trade { action };
    let (session, failure) =
        command_handlers::handle_trade(live.clone(), &command, &state.context()).await?;
    Ok(Json(TradeResponse {
        session: commit(&state, &mut live, session)?,
        failure: failure.map(|f| f.to_string()),
    }))
}

/// POST /{id}/merchant/leave
#[instrument(skip(state))]
async fn leave_merchant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = resident(&state, id).await?;
    let mut live = shared.lock().await;
    let session =
        command_handlers::handle_leave_merchant(live.clone(), &state.context()).await?;
    Ok(Json(commit(&state, &mut live, session)?))
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(abandon_session))
        .route("/{id}/choices", post(select_choice))
        .route("/{id}/character", post(create_character))
        .route("/{id}/combat", post(combat_action))
        .route("/{id}/rest", post(rest))
        .route("/{id}/events", post(resolve_event))
        .route("/{id}/level-up", post(level_up))
        .route("/{id}/trade", post(trade))
        .route("/{id}/merchant/leave", post(leave_merchant))
}
