//! Integration tests for the HTTP API.
//!
//! Requests go through the full router (middleware included) against an
//! in-memory repository, so no database is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tcg_server::api::{AppState, create_router};
use tcg_tournament::collaborators::{LogNotifier, OrganizerOrAdmin};
use tcg_tournament::db::InMemoryTournamentRepository;
use tcg_tournament::{EngineConfig, TournamentManager};
use tower::ServiceExt; // For `oneshot` method

const ORGANIZER: i64 = 42;
const ADMIN: i64 = 1;

/// Helper to create a test server backed by memory
fn create_test_server() -> (axum::Router, Arc<TournamentManager>) {
    let manager = Arc::new(TournamentManager::new(
        Arc::new(InMemoryTournamentRepository::new()),
        Arc::new(OrganizerOrAdmin::new([ADMIN])),
        Arc::new(LogNotifier),
        EngineConfig {
            ordering_seed: Some(5),
            ..Default::default()
        },
    ));

    let state = AppState {
        manager: manager.clone(),
        database: None,
    };

    (create_router(state), manager)
}

/// Send a request and decode the JSON body (Null when empty)
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    actor: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn tournament_event() -> Value {
    json!({
        "name": "Friday Swiss",
        "organizer_id": ORGANIZER,
        "event_type": "tournament",
        "swiss_rounds": 1,
        "top_cut": {"mode": "disabled"}
    })
}

/// Create and approve a tournament, returning its ID
async fn create_approved(app: &axum::Router) -> i64 {
    let (status, body) = send(app, "POST", "/api/v1/tournaments", Some(ORGANIZER), Some(tournament_event())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, _) = send(app, "POST", &format!("/api/v1/tournaments/{id}/approve"), Some(ORGANIZER), None).await;
    assert_eq!(status, StatusCode::OK);
    id
}

/// Register and check in a player as themselves, returning the registration ID
async fn join(app: &axum::Router, id: i64, user_id: i64) -> i64 {
    let (status, registration) = send(
        app,
        "POST",
        &format!("/api/v1/tournaments/{id}/registrations"),
        Some(user_id),
        Some(json!({"username": format!("player{user_id}")})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let registration_id = registration["id"].as_i64().unwrap();

    let (status, _) = send(
        app,
        "POST",
        &format!("/api/v1/tournaments/{id}/registrations/{registration_id}/check-in"),
        Some(ORGANIZER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    registration_id
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_without_database() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["persistent"], false);
    assert_eq!(body["tournaments"]["active_count"], 0);
}

// ============================================================================
// Authentication & Authorization Tests
// ============================================================================

#[tokio::test]
async fn test_writes_require_actor_header() {
    let (app, _) = create_test_server();

    let (status, _) = send(&app, "POST", "/api/v1/tournaments", None, Some(tournament_event())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tournaments")
        .header("x-actor-id", "not-a-number")
        .header("content-type", "application/json")
        .body(Body::from(tournament_event().to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reads_are_public() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;

    let (status, list) = send(&app, "GET", "/api/v1/tournaments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, snapshot) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["phase"], "registration");
    assert_eq!(snapshot["approved"], true);
}

#[tokio::test]
async fn test_other_users_cannot_manage() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;

    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), Some(7), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");

    // Admins manage every tournament
    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/pause"), Some(ADMIN), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
}

#[tokio::test]
async fn test_cannot_create_for_another_organizer() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, "POST", "/api/v1/tournaments", Some(9), Some(tournament_event())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");
}

// ============================================================================
// Error Mapping Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_tournament_is_404() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, "GET", "/api/v1/tournaments/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_meetup_event_is_rejected() {
    let (app, _) = create_test_server();

    let meetup = json!({"name": "Casual night", "organizer_id": ORGANIZER, "event_type": "meetup"});
    let (status, body) = send(&app, "POST", "/api/v1/tournaments", Some(ORGANIZER), Some(meetup)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_rejection_includes_current_state() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;
    join(&app, id, 100).await;

    // One player is not enough to start
    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), Some(ORGANIZER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state");
    assert_eq!(body["state"]["phase"], "registration");
    assert_eq!(body["state"]["id"], id);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;
    join(&app, id, 100).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/registrations"),
        Some(100),
        Some(json!({"username": "player100"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

// ============================================================================
// Tournament Flow Tests
// ============================================================================

#[tokio::test]
async fn test_single_round_event_over_http() {
    let (app, manager) = create_test_server();
    let id = create_approved(&app).await;
    for user_id in 100..104 {
        join(&app, id, user_id).await;
    }

    let (status, started) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), Some(ORGANIZER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["phase"], "swiss");
    assert_eq!(started["participants"], 4);
    let round_id = started["first_round_id"].as_i64().unwrap();

    let (status, round) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/rounds/{round_id}/start"),
        Some(ORGANIZER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let matches = round["matches"].as_array().unwrap().clone();
    assert_eq!(matches.len(), 2);

    for m in &matches {
        let match_id = m["id"].as_i64().unwrap();
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/tournaments/{id}/matches/{match_id}/start"),
            Some(ORGANIZER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, reported) = send(
            &app,
            "POST",
            &format!("/api/v1/tournaments/{id}/matches/{match_id}/result"),
            Some(ORGANIZER),
            Some(json!({"player1_score": 2, "player2_score": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reported["winner"], m["player1"]);
    }

    // A second report for the same match is a conflict
    let first_match = matches[0]["id"].as_i64().unwrap();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/{first_match}/result"),
        Some(ORGANIZER),
        Some(json!({"player1_score": 2, "player2_score": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, advance) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/rounds/{round_id}/finish"),
        Some(ORGANIZER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advance["next"]["step"], "tournament_finished");
    assert_eq!(advance["phase"], "finished");

    let (status, standings) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/standings"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let standings = standings.as_array().unwrap();
    assert_eq!(standings.len(), 4);
    assert_eq!(standings[0]["match_points"], 3);
    assert_eq!(standings[3]["match_points"], 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_invalid_scores_are_unprocessable() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;
    join(&app, id, 100).await;
    join(&app, id, 101).await;

    let (_, started) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), Some(ORGANIZER), None).await;
    let round_id = started["first_round_id"].as_i64().unwrap();
    let (_, round) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/rounds/{round_id}/start"),
        Some(ORGANIZER),
        None,
    )
    .await;
    let match_id = round["matches"][0]["id"].as_i64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/{match_id}/start"),
        Some(ORGANIZER),
        None,
    )
    .await;

    for scores in [json!({"player1_score": -1, "player2_score": 2}), json!({"player1_score": 0, "player2_score": 0})] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/tournaments/{id}/matches/{match_id}/result"),
            Some(ORGANIZER),
            Some(scores),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    // Forcing the round closes the match as a draw
    let (status, advance) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/rounds/{round_id}/force-finish"),
        Some(ORGANIZER),
        Some(json!({"reason": "time expired"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advance["forced_matches"], 1);
}

#[tokio::test]
async fn test_details_hide_decklists_by_default() {
    let (app, _) = create_test_server();
    let id = create_approved(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/registrations"),
        Some(100),
        Some(json!({"username": "player100", "decklist": "4 Lightning Bolt"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, details) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/details"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["registrations"][0]["username"], "player100");
    assert!(details["registrations"][0]["decklist"].is_null());
}
