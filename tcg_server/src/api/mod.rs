//! HTTP API for the tournament server.
//!
//! This module exposes the tournament engine over REST. Every tournament is
//! managed by a dedicated actor task; handlers forward commands through the
//! [`TournamentManager`] and translate rejections into HTTP errors.
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament, registration, round and match endpoints
//! - [`middleware`]: Acting-user middleware for write endpoints
//! - [`request_id`]: Request correlation, access logging and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `GET /api/v1/tournaments` - List tournaments
//! - `GET /api/v1/tournaments/{id}` - Tournament summary
//! - `GET /api/v1/tournaments/{id}/details` - Registrations, rounds and matches
//! - `GET /api/v1/tournaments/{id}/standings` - Ranked standings
//!
//! ## Acting user required (`x-actor-id`)
//! - `POST /api/v1/tournaments` - Create from an event
//! - `POST /api/v1/tournaments/{id}/registrations` - Register yourself
//! - everything else under `/api/v1/tournaments/{id}/...` (organizer or admin)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tcg_server::api::{AppState, create_router};
//! use tcg_tournament::{EngineConfig, TournamentManager};
//! use tcg_tournament::collaborators::{LogNotifier, OrganizerOrAdmin};
//! use tcg_tournament::db::InMemoryTournamentRepository;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let manager = TournamentManager::new(
//!     Arc::new(InMemoryTournamentRepository::new()),
//!     Arc::new(OrganizerOrAdmin::default()),
//!     Arc::new(LogNotifier),
//!     EngineConfig::default(),
//! );
//! let state = AppState {
//!     manager: Arc::new(manager),
//!     database: None,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod middleware;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tcg_tournament::{TournamentManager, db::Database};
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers.
///
/// # Fields
///
/// - `manager`: Owns the tournament actors and forwards commands to them
/// - `database`: Connection pool for health checks; `None` when running in memory
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub database: Option<Arc<Database>>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                              - Health check
/// GET  /api/v1/tournaments                                  - List (public)
/// POST /api/v1/tournaments                                  - Create
/// GET  /api/v1/tournaments/{id}                             - Summary (public)
/// GET  /api/v1/tournaments/{id}/details                     - Full state (public)
/// GET  /api/v1/tournaments/{id}/standings                   - Standings (public)
/// POST /api/v1/tournaments/{id}/approve                     - Approve
/// POST /api/v1/tournaments/{id}/start                       - Start
/// POST /api/v1/tournaments/{id}/finish                      - Finish
/// POST /api/v1/tournaments/{id}/pause                       - Pause
/// POST /api/v1/tournaments/{id}/resume                      - Resume
/// POST /api/v1/tournaments/{id}/registrations               - Register
/// POST /api/v1/tournaments/{id}/registrations/{rid}/check-in
/// POST /api/v1/tournaments/{id}/registrations/{rid}/cancel
/// POST /api/v1/tournaments/{id}/registrations/{rid}/no-show
/// POST /api/v1/tournaments/{id}/rounds/{round}/pairings
/// POST /api/v1/tournaments/{id}/rounds/{round}/start
/// POST /api/v1/tournaments/{id}/rounds/{round}/finish
/// POST /api/v1/tournaments/{id}/rounds/{round}/force-finish
/// POST /api/v1/tournaments/{id}/matches/{match}/start
/// POST /api/v1/tournaments/{id}/matches/{match}/result
/// PUT  /api/v1/tournaments/{id}/matches/{match}/result
/// POST /api/v1/tournaments/{id}/matches/{match}/disqualify
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route(
            "/tournaments/{id}/details",
            get(tournaments::get_tournament_details),
        )
        .route("/tournaments/{id}/standings", get(tournaments::get_standings));

    let protected_routes = Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route("/tournaments/{id}/approve", post(tournaments::approve))
        .route("/tournaments/{id}/start", post(tournaments::start))
        .route("/tournaments/{id}/finish", post(tournaments::finish))
        .route("/tournaments/{id}/pause", post(tournaments::pause))
        .route("/tournaments/{id}/resume", post(tournaments::resume))
        .route("/tournaments/{id}/registrations", post(tournaments::register))
        .route(
            "/tournaments/{id}/registrations/{registration_id}/check-in",
            post(tournaments::check_in),
        )
        .route(
            "/tournaments/{id}/registrations/{registration_id}/cancel",
            post(tournaments::cancel_registration),
        )
        .route(
            "/tournaments/{id}/registrations/{registration_id}/no-show",
            post(tournaments::mark_no_show),
        )
        .route(
            "/tournaments/{id}/rounds/{round_id}/pairings",
            post(tournaments::generate_pairings),
        )
        .route(
            "/tournaments/{id}/rounds/{round_id}/start",
            post(tournaments::start_round),
        )
        .route(
            "/tournaments/{id}/rounds/{round_id}/finish",
            post(tournaments::finish_round),
        )
        .route(
            "/tournaments/{id}/rounds/{round_id}/force-finish",
            post(tournaments::force_finish_round),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/start",
            post(tournaments::start_match),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/result",
            post(tournaments::submit_result).put(tournaments::correct_result),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/disqualify",
            post(tournaments::disqualify_player),
        )
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database (if configured) answers, or
/// `503 Service Unavailable` otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"tournaments":{"active_count":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(database) => database.health_check().await.is_ok(),
        None => true,
    };

    let active_count = state.manager.active_tournament_count().await;
    metrics::active_tournaments(active_count);

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "persistent": state.database.is_some(),
        "tournaments": {
            "active_count": active_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
