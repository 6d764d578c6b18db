//! Round error types.

use super::models::{RoundId, RoundStatus};
use crate::matches::MatchError;
use thiserror::Error;

/// Round errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// Transition not allowed from the current status
    #[error("round {id} cannot {action} while {status}")]
    InvalidState {
        id: RoundId,
        action: &'static str,
        status: RoundStatus,
    },

    #[error("pairings for round {0} were already generated")]
    PairingsAlreadyGenerated(RoundId),

    #[error("round {0} has no pairings yet")]
    PairingsMissing(RoundId),

    #[error("round {0} has no matches")]
    NoMatches(RoundId),

    #[error("round {id} still has {pending} unfinished match(es)")]
    UnfinishedMatches { id: RoundId, pending: usize },

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Result type for round operations
pub type RoundResult<T> = Result<T, RoundError>;
