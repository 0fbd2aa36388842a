//! Route modules.

pub mod health;
pub mod session;

use axum::Router;

use crate::state::AppState;

/// The full application router, without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/sessions", session::router())
        .with_state(state)
}
