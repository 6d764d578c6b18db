//! Tournament API handlers.
//!
//! This module provides HTTP REST endpoints for tournament operations:
//! - Creating tournaments from event payloads and listing them
//! - Registration, check-in and withdrawals
//! - Starting the event, pairing and running rounds
//! - Reporting, correcting and forfeiting match results
//! - Standings, pausing and finishing
//!
//! Reads are public. Every write requires the `x-actor-id` header; all
//! writes except self-registration also require the actor to manage the
//! tournament.
//!
//! # Examples
//!
//! Report a result:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/matches/7/result \
//!   -H "x-actor-id: 42" \
//!   -H "Content-Type: application/json" \
//!   -d '{"player1_score": 2, "player2_score": 1}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tcg_tournament::{
    Event, Match, MatchId, Registration, RegistrationId, Rejection, Round, RoundId,
    StandingEntry, Tournament, TournamentId, TournamentReply, TournamentSnapshot,
    tournament::{CorrectionOutcome, DisqualificationOutcome, NextStep, RoundAdvance, StartOutcome},
};

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub decklist: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultRequest {
    pub player1_score: i64,
    pub player2_score: i64,
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub player1_score: i64,
    pub player2_score: i64,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct DisqualifyRequest {
    pub registration_id: RegistrationId,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

/// Body of a pause request; `{}` pauses without a reason
#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    /// Tournament state at the time of the rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TournamentSnapshot>,
}

/// A rejected command rendered as an HTTP error
#[derive(Debug)]
pub struct ApiError(pub Rejection);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.error.kind() {
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_state" | "conflict" => StatusCode::CONFLICT,
            "validation" => StatusCode::UNPROCESSABLE_ENTITY,
            "unauthorized" => StatusCode::FORBIDDEN,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.error.kind(), "Tournament command failed: {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.error.client_message(),
            kind: self.0.error.kind(),
            state: self.0.state,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Count the outcome of a command and convert it for the response
fn respond<T>(operation: &'static str, reply: TournamentReply<T>) -> ApiResult<T> {
    match reply {
        Ok(value) => {
            metrics::tournament_operation(operation, "ok");
            Ok(Json(value))
        }
        Err(rejection) => {
            metrics::tournament_operation(operation, rejection.error.kind());
            Err(rejection.into())
        }
    }
}

fn count_advance(reply: &TournamentReply<RoundAdvance>, forced: bool) {
    if let Ok(advance) = reply {
        metrics::rounds_finished_total(forced);
        if advance.next == NextStep::TournamentFinished {
            tracing::info!(phase = %advance.phase, "Tournament completed");
        }
    }
}

/// List all tournaments.
///
/// # Response
///
/// Returns `200 OK` with an array of tournament snapshots.
pub async fn list_tournaments(State(state): State<AppState>) -> ApiResult<Vec<TournamentSnapshot>> {
    respond(
        "list_tournaments",
        state.manager.list_tournaments().await.map_err(Rejection::from),
    )
}

/// Create a tournament from an event payload.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Friday Swiss",
///   "organizer_id": 42,
///   "event_type": "tournament",
///   "swiss_rounds": 4,
///   "top_cut": {"mode": "fixed", "size": 8}
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Actor may not organize for `organizer_id`
/// - `422 Unprocessable Entity`: Not a tournament event, or invalid settings
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Json(event): Json<Event>,
) -> Result<(StatusCode, Json<TournamentSnapshot>), ApiError> {
    let Json(snapshot) = respond(
        "create_tournament",
        state.manager.create_tournament(actor_id, event).await,
    )?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Get a tournament summary.
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<TournamentSnapshot> {
    respond("get_tournament", state.manager.snapshot(tournament_id).await)
}

/// Get the full tournament: registrations, rounds and matches.
pub async fn get_tournament_details(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let reply = state.manager.tournament(tournament_id).await.map(|mut tournament| {
        if !tournament.settings.decklists_public {
            for registration in tournament.registrations.iter_mut() {
                registration.decklist = None;
            }
        }
        tournament
    });
    respond("get_tournament_details", reply)
}

/// Get ranked standings.
pub async fn get_standings(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Vec<StandingEntry>> {
    respond("get_standings", state.manager.standings(tournament_id).await)
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<TournamentSnapshot> {
    respond("approve", state.manager.approve(actor_id, tournament_id).await)
}

/// Register the acting user.
///
/// # Errors
///
/// - `409 Conflict`: Already registered, registration closed, or full
/// - `422 Unprocessable Entity`: Missing username or required decklist
pub async fn register(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let Json(registration) = respond(
        "register",
        state
            .manager
            .register(tournament_id, actor_id, request.username, request.decklist)
            .await,
    )?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn check_in(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, registration_id)): Path<(TournamentId, RegistrationId)>,
) -> ApiResult<Registration> {
    respond(
        "check_in",
        state
            .manager
            .check_in(actor_id, tournament_id, registration_id)
            .await,
    )
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, registration_id)): Path<(TournamentId, RegistrationId)>,
) -> ApiResult<Registration> {
    respond(
        "cancel_registration",
        state
            .manager
            .cancel_registration(actor_id, tournament_id, registration_id)
            .await,
    )
}

pub async fn mark_no_show(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, registration_id)): Path<(TournamentId, RegistrationId)>,
) -> ApiResult<Registration> {
    respond(
        "mark_no_show",
        state
            .manager
            .mark_no_show(actor_id, tournament_id, registration_id)
            .await,
    )
}

/// Seed the field and open Swiss round 1.
///
/// # Errors
///
/// - `409 Conflict`: Not approved, not in registration, or too few players
pub async fn start(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<StartOutcome> {
    respond("start", state.manager.start(actor_id, tournament_id).await)
}

pub async fn generate_pairings(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, round_id)): Path<(TournamentId, RoundId)>,
) -> ApiResult<Vec<Match>> {
    respond(
        "generate_pairings",
        state
            .manager
            .generate_pairings(actor_id, tournament_id, round_id)
            .await,
    )
}

pub async fn start_round(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, round_id)): Path<(TournamentId, RoundId)>,
) -> ApiResult<Round> {
    respond(
        "start_round",
        state.manager.start_round(actor_id, tournament_id, round_id).await,
    )
}

/// Close a round whose matches are all finished and advance the event.
pub async fn finish_round(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, round_id)): Path<(TournamentId, RoundId)>,
) -> ApiResult<RoundAdvance> {
    let reply = state
        .manager
        .finish_round(actor_id, tournament_id, round_id)
        .await;
    count_advance(&reply, false);
    respond("finish_round", reply)
}

/// Close every open match 0-0 and advance the event.
pub async fn force_finish_round(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, round_id)): Path<(TournamentId, RoundId)>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<RoundAdvance> {
    logging::log_admin_override("force_finish_round", actor_id, tournament_id, &request.reason);
    let reply = state
        .manager
        .force_finish_round(actor_id, tournament_id, round_id, request.reason)
        .await;
    count_advance(&reply, true);
    respond("force_finish_round", reply)
}

pub async fn start_match(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> ApiResult<Match> {
    respond(
        "start_match",
        state.manager.start_match(actor_id, tournament_id, match_id).await,
    )
}

/// Report a match result.
///
/// # Errors
///
/// - `409 Conflict`: Result already reported, or match not in progress
/// - `422 Unprocessable Entity`: Negative scores or a 0-0 result
pub async fn submit_result(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<ResultRequest>,
) -> ApiResult<Match> {
    let reply = state
        .manager
        .submit_result(
            actor_id,
            tournament_id,
            match_id,
            request.player1_score,
            request.player2_score,
        )
        .await;
    if reply.is_ok() {
        metrics::match_results_total();
    }
    respond("submit_result", reply)
}

pub async fn correct_result(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<CorrectionRequest>,
) -> ApiResult<CorrectionOutcome> {
    logging::log_admin_override("correct_result", actor_id, tournament_id, &request.note);
    respond(
        "correct_result",
        state
            .manager
            .correct_result(
                actor_id,
                tournament_id,
                match_id,
                request.player1_score,
                request.player2_score,
                request.note,
            )
            .await,
    )
}

pub async fn disqualify_player(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<DisqualifyRequest>,
) -> ApiResult<DisqualificationOutcome> {
    logging::log_admin_override("disqualify_player", actor_id, tournament_id, &request.reason);
    respond(
        "disqualify_player",
        state
            .manager
            .disqualify_player(
                actor_id,
                tournament_id,
                match_id,
                request.registration_id,
                request.reason,
            )
            .await,
    )
}

/// Freeze final standings, cancelling any open round.
pub async fn finish(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Vec<StandingEntry>> {
    respond("finish", state.manager.finish(actor_id, tournament_id).await)
}

pub async fn pause(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<PauseRequest>,
) -> ApiResult<ChangedResponse> {
    let reply = state
        .manager
        .pause(actor_id, tournament_id, request.reason)
        .await
        .map(|changed| ChangedResponse { changed });
    respond("pause", reply)
}

pub async fn resume(
    State(state): State<AppState>,
    Extension(actor_id): Extension<i64>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<ChangedResponse> {
    let reply = state
        .manager
        .resume(actor_id, tournament_id)
        .await
        .map(|changed| ChangedResponse { changed });
    respond("resume", reply)
}
