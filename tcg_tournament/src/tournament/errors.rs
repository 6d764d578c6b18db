//! Tournament error types.

use super::models::TournamentId;
use crate::db::RepositoryError;
use crate::matches::{MatchError, MatchId};
use crate::registration::RegistrationId;
use crate::round::{RoundError, RoundId};
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// A precondition of the operation does not hold
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Input rejected before any state change
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A concurrent writer got there first
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("User {actor_id} may not manage tournament {tournament_id}")]
    Unauthorized {
        actor_id: i64,
        tournament_id: TournamentId,
    },

    /// Stored state contradicts itself; indicates a bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    #[error("User {0} is already registered")]
    AlreadyRegistered(i64),

    #[error("Tournament is full ({0} participants)")]
    TournamentFull(u32),

    #[error("Event is not a tournament")]
    NotATournament,

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Tournament {0} is not accepting commands")]
    ActorUnavailable(TournamentId),
}

impl TournamentError {
    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            TournamentError::NotFound(_)
            | TournamentError::RoundNotFound(_)
            | TournamentError::MatchNotFound(_)
            | TournamentError::RegistrationNotFound(_) => "not_found",
            TournamentError::InvalidState(_)
            | TournamentError::InsufficientPlayers { .. }
            | TournamentError::TournamentFull(_) => "invalid_state",
            TournamentError::Validation(_) | TournamentError::NotATournament => "validation",
            TournamentError::Conflict(_) | TournamentError::AlreadyRegistered(_) => "conflict",
            TournamentError::Unauthorized { .. } => "unauthorized",
            TournamentError::InvariantViolation(_) => "invariant_violation",
            TournamentError::Repository(_) => "repository",
            TournamentError::ActorUnavailable(_) => "unavailable",
        }
    }

    /// Message safe to show to API clients
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Repository(_) => "Storage error, please retry".to_string(),
            TournamentError::InvariantViolation(_) => {
                "Internal consistency error, the operation was rejected".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<MatchError> for TournamentError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::AlreadyReported(_) => TournamentError::Conflict(err.to_string()),
            MatchError::ScorelessResult
            | MatchError::InvalidScore(_)
            | MatchError::NotAParticipant { .. } => TournamentError::Validation(err.to_string()),
            MatchError::Inconsistent { .. } => TournamentError::InvariantViolation(err.to_string()),
            MatchError::InvalidState { .. } => TournamentError::InvalidState(err.to_string()),
        }
    }
}

impl From<RoundError> for TournamentError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::Match(inner) => inner.into(),
            other => TournamentError::InvalidState(other.to_string()),
        }
    }
}

impl From<RepositoryError> for TournamentError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => TournamentError::NotFound(id),
            RepositoryError::VersionConflict { .. } => TournamentError::Conflict(err.to_string()),
            other => TournamentError::Repository(other),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::MatchStatus;

    #[test]
    fn test_match_errors_map_to_categories() {
        let err: TournamentError = MatchError::AlreadyReported(4).into();
        assert_eq!(err.kind(), "conflict");

        let err: TournamentError = MatchError::ScorelessResult.into();
        assert_eq!(err.kind(), "validation");

        let err: TournamentError = MatchError::InvalidState {
            id: 1,
            action: "start",
            status: MatchStatus::Finished,
        }
        .into();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[test]
    fn test_round_errors_unwrap_match_errors() {
        let err: TournamentError = RoundError::Match(MatchError::InvalidScore(-1)).into();
        assert!(matches!(err, TournamentError::Validation(_)));

        let err: TournamentError = RoundError::UnfinishedMatches { id: 2, pending: 3 }.into();
        assert!(matches!(err, TournamentError::InvalidState(_)));
    }

    #[test]
    fn test_version_conflict_is_a_conflict() {
        let err: TournamentError = RepositoryError::VersionConflict { id: 1, expected: 3 }.into();
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn test_client_message_hides_internals() {
        let err = TournamentError::InvariantViolation("winner 9 not in match 3".into());
        assert!(!err.client_message().contains("winner 9"));
    }
}
