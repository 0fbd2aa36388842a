//! Integration tests for the Session & Progress routes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use emberfall_test_support::{FailingStore, InMemoryStore};
use serde_json::json;
use uuid::Uuid;

fn choice_ids(view: &serde_json::Value) -> Vec<&str> {
    view["node"]["choices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_session_starts_at_campaign_start() {
    let app = common::build_test_app();

    let (status, json) =
        common::post_json(app, "/api/v1/sessions", &json!({})).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["campaignId"], "ashfall");
    assert_eq!(json["screen"], "story");
    assert_eq!(json["node"]["id"], "village_square");
    assert!(json["character"].is_null());
    assert_eq!(choice_ids(&json), ["create_hero", "quick_start", "peddler"]);
}

#[tokio::test]
async fn test_quick_start_creates_default_character() {
    // Arrange
    let app = common::build_test_app();
    let id = common::new_session(&app).await;

    // Act
    let view = common::choose(&app, &id, "quick_start").await;

    // Assert
    assert_eq!(view["node"]["id"], "quick_start");
    assert_eq!(view["character"]["name"], "Wanderer");
    assert_eq!(view["character"]["class"], "fighter");
    assert_eq!(view["character"]["level"], 1);
}

#[tokio::test]
async fn test_unknown_choice_returns_400_and_keeps_session() {
    let app = common::build_test_app();
    let id = common::new_session(&app).await;

    let (status, json) = common::post_json(
        app.clone(),
        &format!("/api/v1/sessions/{id}/choices"),
        &json!({ "choiceId": "fly_away" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "choice_not_found");
    let (status, view) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["node"]["id"], "village_square");
}

#[tokio::test]
async fn test_get_unknown_session_returns_404() {
    let app = common::build_test_app();

    let (status, json) =
        common::get_json(app, &format!("/api/v1/sessions/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_session_resumes_from_save_in_a_fresh_server() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let first = common::build_test_app_with_store(store.clone());
    let id = common::new_session(&first).await;
    common::choose(&first, &id, "quick_start").await;

    // Act
    let second = common::build_test_app_with_store(store);
    let (status, view) = common::get_json(second, &format!("/api/v1/sessions/{id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["node"]["id"], "quick_start");
    assert_eq!(view["character"]["name"], "Wanderer");
}

#[tokio::test]
async fn test_corrupted_save_is_reported_as_missing() {
    let store = Arc::new(InMemoryStore::new());
    let id = Uuid::new_v4();
    store.insert(&format!("emberfall:save:{id}"), json!({ "garbage": true }));
    let app = common::build_test_app_with_store(store);

    let (status, _) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failing_store_does_not_block_play() {
    let app = common::build_test_app_with_store(Arc::new(FailingStore));
    let id = common::new_session(&app).await;

    let view = common::choose(&app, &id, "quick_start").await;

    assert_eq!(view["character"]["name"], "Wanderer");
}

#[tokio::test]
async fn test_create_character_through_creation_screen() {
    // Arrange
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    let view = common::choose(&app, &id, "create_hero").await;
    assert_eq!(view["screen"], "characterCreation");
    let abilities = json!({
        "strength": 10, "dexterity": 16, "constitution": 12,
        "intelligence": 14, "wisdom": 10, "charisma": 8,
    });

    // Act
    let (status, view) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/character"),
        &json!({ "name": "Sable", "class": "rogue", "abilities": abilities }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["screen"], "story");
    assert_eq!(view["node"]["id"], "elder");
    assert_eq!(view["character"]["name"], "Sable");
    assert_eq!(view["world"]["gold"], 30);
}

#[tokio::test]
async fn test_create_character_with_blank_name_is_rejected() {
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "create_hero").await;

    let (status, json) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/character"),
        &json!({
            "name": "  ",
            "class": "wizard",
            "abilities": {
                "strength": 8, "dexterity": 14, "constitution": 12,
                "intelligence": 16, "wisdom": 12, "charisma": 10,
            },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_combat_action_outside_combat_returns_409() {
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;

    let (status, json) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/combat"),
        &json!({ "type": "attack" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn test_retreat_from_goblin_returns_to_village_poorer() {
    // Arrange
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;
    common::choose(&app, &id, "elder").await;
    common::choose(&app, &id, "road").await;
    let view = common::choose(&app, &id, "fight").await;
    assert_eq!(view["screen"], "combat");
    assert_eq!(view["combat"]["enemyName"], "Goblin");
    assert_eq!(view["combat"]["canRetreat"], true);

    // Act
    let (status, view) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/combat"),
        &json!({ "type": "retreat" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["screen"], "story");
    assert_eq!(view["node"]["id"], "village_square");
    assert_eq!(view["world"]["gold"], 20);
    assert!(view["character"]["hp"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn test_merchant_trade_and_leave() {
    // Arrange
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;
    common::choose(&app, &id, "elder").await;
    common::choose(&app, &id, "back").await;
    let view = common::choose(&app, &id, "peddler").await;
    assert_eq!(view["screen"], "merchant");
    let trade_uri = format!("/api/v1/sessions/{id}/trade");

    // Act
    let (status, bought) = common::post_json(
        app.clone(),
        &trade_uri,
        &json!({ "type": "buy", "itemId": "alchemist_fire" }),
    )
    .await;
    let (_, refused) = common::post_json(
        app.clone(),
        &trade_uri,
        &json!({ "type": "buy", "itemId": "healing_potion" }),
    )
    .await;
    let (left_status, left) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/merchant/leave"),
        &json!({}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert!(bought["failure"].is_null());
    assert_eq!(bought["session"]["world"]["gold"], 10);
    assert_eq!(bought["session"]["world"]["items"]["alchemist_fire"], 1);
    assert!(refused["failure"].as_str().unwrap().contains("not enough gold"));
    assert_eq!(refused["session"]["world"]["gold"], 10);
    assert_eq!(left_status, StatusCode::OK);
    assert_eq!(left["screen"], "story");
    assert_eq!(left["node"]["id"], "village_square");
}

#[tokio::test]
async fn test_rest_in_village_draws_camp_event() {
    // Arrange
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;

    // Act
    let (status, camp) = common::post_json(
        app.clone(),
        &format!("/api/v1/sessions/{id}/rest"),
        &json!({}),
    )
    .await;
    let (resolved_status, resolved) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/events"),
        &json!({ "choiceId": "feed" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(camp["screen"], "camp");
    assert_eq!(camp["event"]["id"], "stray_dog");
    assert_eq!(resolved_status, StatusCode::OK);
    assert_eq!(resolved["screen"], "story");
    assert!(resolved["event"].is_null());
    assert_eq!(resolved["character"]["hp"], resolved["character"]["maxHp"]);
}

#[tokio::test]
async fn test_level_up_without_pending_level_returns_409() {
    let app = common::build_test_app();
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;

    let (status, _) = common::post_json(
        app,
        &format!("/api/v1/sessions/{id}/level-up"),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_abandon_removes_session_and_save() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let app = common::build_test_app_with_store(store.clone());
    let id = common::new_session(&app).await;
    assert!(store.get(&format!("emberfall:save:{id}")).is_some());

    // Act
    let status = common::delete(app.clone(), &format!("/api/v1/sessions/{id}")).await;

    // Assert
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.get(&format!("emberfall:save:{id}")).is_none());
    let (status, _) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_busy_session_does_not_hold_up_other_players() {
    // Arrange
    let state = common::build_test_state(Arc::new(InMemoryStore::new()));
    let app = emberfall_api::routes::app(state.clone());
    let busy = common::new_session(&app).await;
    let busy_id = Uuid::parse_str(&busy).unwrap();
    let held = state.live(busy_id).await.unwrap();
    let _guard = held.lock().await;

    // Act
    let other = tokio::time::timeout(Duration::from_secs(5), async {
        let id = common::new_session(&app).await;
        common::choose(&app, &id, "quick_start").await
    })
    .await;

    // Assert
    let view = other.expect("another session was blocked by a busy one");
    assert_eq!(view["character"]["name"], "Wanderer");
}

#[tokio::test]
async fn test_idle_session_is_unloaded_and_resumed_on_next_request() {
    // Arrange
    let store = Arc::new(InMemoryStore::new());
    let state = common::build_test_state(store.clone());
    let app = emberfall_api::routes::app(state.clone());
    let id = common::new_session(&app).await;
    common::choose(&app, &id, "quick_start").await;
    let session_id = Uuid::parse_str(&id).unwrap();
    {
        let live = state.live(session_id).await.unwrap();
        let mut session = live.lock().await;
        session.last_played_at -= chrono::Duration::hours(1);
        session.play_time_seconds = 4242;
    }

    // Act
    let (status, view) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["node"]["id"], "quick_start");
    assert_eq!(view["character"]["name"], "Wanderer");
    let saved = store.get(&format!("emberfall:save:{id}")).unwrap();
    assert_eq!(saved["metadata"]["playTimeSeconds"], 4242);
}
