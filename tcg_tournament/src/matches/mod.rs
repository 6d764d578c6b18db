//! Matches: one game between two participants, or a bye.

pub mod errors;
pub mod models;

pub use errors::{MatchError, MatchResult};
pub use models::{BYE_SCORE, FORCED_NOTE_PREFIX, Match, MatchId, MatchStatus, validate_scores};
