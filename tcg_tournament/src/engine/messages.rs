//! Tournament actor message types.

use crate::matches::{Match, MatchId};
use crate::registration::{Registration, RegistrationId};
use crate::round::{Round, RoundId};
use crate::standings::StandingEntry;
use crate::tournament::{
    CorrectionOutcome, DisqualificationOutcome, RoundAdvance, StartOutcome, Tournament,
    TournamentError, TournamentId, TournamentSnapshot,
};
use thiserror::Error;
use tokio::sync::oneshot;

/// A refused command, with the authoritative state at the time of refusal
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejection {
    pub error: TournamentError,
    pub state: Option<TournamentSnapshot>,
}

impl Rejection {
    pub fn new(error: TournamentError, state: Option<TournamentSnapshot>) -> Self {
        Self { error, state }
    }

    pub fn unavailable(id: TournamentId) -> Self {
        TournamentError::ActorUnavailable(id).into()
    }
}

impl From<TournamentError> for Rejection {
    fn from(error: TournamentError) -> Self {
        Self { error, state: None }
    }
}

/// Reply to a tournament command
pub type TournamentReply<T> = Result<T, Rejection>;

/// Response channel for a command
pub type Responder<T> = oneshot::Sender<TournamentReply<T>>;

/// Messages that can be sent to a TournamentActor
#[derive(Debug)]
pub enum TournamentMessage {
    /// Summary of the current state
    GetSnapshot {
        response: oneshot::Sender<TournamentSnapshot>,
    },

    /// Full aggregate
    GetTournament {
        response: oneshot::Sender<Tournament>,
    },

    /// Standings from the last refresh
    GetStandings {
        response: oneshot::Sender<Vec<StandingEntry>>,
    },

    Approve {
        response: Responder<TournamentSnapshot>,
    },

    Register {
        user_id: i64,
        username: String,
        decklist: Option<String>,
        response: Responder<Registration>,
    },

    CheckIn {
        registration_id: RegistrationId,
        response: Responder<Registration>,
    },

    CancelRegistration {
        registration_id: RegistrationId,
        response: Responder<Registration>,
    },

    MarkNoShow {
        registration_id: RegistrationId,
        response: Responder<Registration>,
    },

    Start {
        response: Responder<StartOutcome>,
    },

    GeneratePairings {
        round_id: RoundId,
        response: Responder<Vec<Match>>,
    },

    StartRound {
        round_id: RoundId,
        response: Responder<Round>,
    },

    StartMatch {
        match_id: MatchId,
        response: Responder<Match>,
    },

    SubmitResult {
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
        response: Responder<Match>,
    },

    CorrectResult {
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
        note: String,
        response: Responder<CorrectionOutcome>,
    },

    DisqualifyPlayer {
        match_id: MatchId,
        registration_id: RegistrationId,
        reason: String,
        response: Responder<DisqualificationOutcome>,
    },

    FinishRound {
        round_id: RoundId,
        response: Responder<RoundAdvance>,
    },

    ForceFinishRound {
        round_id: RoundId,
        reason: String,
        response: Responder<RoundAdvance>,
    },

    Finish {
        response: Responder<Vec<StandingEntry>>,
    },

    Pause {
        reason: Option<String>,
        response: Responder<bool>,
    },

    Resume {
        response: Responder<bool>,
    },

    /// Internal: check for rounds past their time limit
    Tick,

    /// Stop the actor
    Shutdown,
}
