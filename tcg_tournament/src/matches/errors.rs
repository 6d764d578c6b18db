//! Match error types.

use super::models::{MatchId, MatchStatus};
use crate::registration::RegistrationId;
use thiserror::Error;

/// Match errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Transition not allowed from the current status
    #[error("match {id} cannot {action} while {status}")]
    InvalidState {
        id: MatchId,
        action: &'static str,
        status: MatchStatus,
    },

    /// Result already recorded by an earlier submission
    #[error("match {0} already has a result")]
    AlreadyReported(MatchId),

    /// A played result must have at least one game won
    #[error("a submitted result cannot be 0-0")]
    ScorelessResult,

    /// Score outside the accepted range
    #[error("invalid score {0}: must be a non-negative integer")]
    InvalidScore(i64),

    /// The registration does not play in this match
    #[error("registration {player} does not play in match {id}")]
    NotAParticipant { id: MatchId, player: RegistrationId },

    /// Stored result contradicts itself
    #[error("match {id} is inconsistent: {reason}")]
    Inconsistent { id: MatchId, reason: String },
}

/// Result type for match operations
pub type MatchResult<T> = Result<T, MatchError>;
