//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use emberfall_content::domain::{Campaign, DocumentFormat};
use emberfall_core::clock::Clock;
use emberfall_core::storage::KeyValueStore;
use emberfall_session::domain::EngineConfig;
use emberfall_test_support::{FixedClock, InMemoryStore, MockRng};
use http_body_util::BodyExt;
use tower::ServiceExt;

use emberfall_api::routes;
use emberfall_api::state::{AppState, SharedRng};

const ASHFALL: &str = include_str!("../../../../campaigns/ashfall.yaml");

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The bundled campaign.
pub fn campaign() -> Arc<Campaign> {
    Arc::new(Campaign::compile(ASHFALL, DocumentFormat::Yaml).unwrap())
}

/// Build the full app router over a fresh in-memory store and `MockRng`.
pub fn build_test_app() -> Router {
    build_test_app_with_store(Arc::new(InMemoryStore::new()))
}

/// Build the full app router over `store`. Routers built over the same
/// store share saves but not live sessions.
pub fn build_test_app_with_store(store: Arc<dyn KeyValueStore>) -> Router {
    routes::app(build_test_state(store))
}

/// Application state over `store` with `MockRng` and the fixed clock.
pub fn build_test_state(store: Arc<dyn KeyValueStore>) -> AppState {
    let rng: SharedRng = Arc::new(std::sync::Mutex::new(MockRng));
    AppState::new(
        campaign(),
        EngineConfig::default(),
        fixed_clock(),
        rng,
        store,
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request and return the status.
pub async fn delete(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await.0
}

/// Start a session and return its id.
pub async fn new_session(app: &Router) -> String {
    let (status, json) = post_json(app.clone(), "/api/v1/sessions", &serde_json::json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    json["sessionId"].as_str().unwrap().to_owned()
}

/// Take `choice_id` on session `id` and return the new view.
pub async fn choose(app: &Router, id: &str, choice_id: &str) -> serde_json::Value {
    let (status, json) = post_json(
        app.clone(),
        &format!("/api/v1/sessions/{id}/choices"),
        &serde_json::json!({ "choiceId": choice_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "choice {choice_id} failed: {json}");
    json
}
