//! Pairing engine for Swiss and single-elimination rounds.
//!
//! Every function here is a pure function of an ordered participant list;
//! the tournament controller decides which one applies to a round and turns
//! the resulting [`Pairing`]s into matches.
//!
//! - Swiss round 1: participants shuffled by an [`OrderingStrategy`], then
//!   paired consecutively.
//! - Swiss rounds 2+: participants ranked by match points and opponents'
//!   match-win percentage, then paired consecutively (optionally avoiding
//!   rematches).
//! - Top cut round 1: rank 1 vs N, rank 2 vs N-1, ...
//! - Later top-cut rounds: previous winners paired in table order.
//!
//! An odd participant count always leaves exactly one bye, given to the
//! last participant in pairing order.

pub mod elimination;
pub mod ordering;
pub mod swiss;

pub use elimination::{advance_winners, effective_cut_size, seeded_bracket};
pub use ordering::{OrderingStrategy, PreserveOrdering, RandomOrdering};
pub use swiss::{SwissCandidate, pair_by_standing, round_one};

use crate::registration::RegistrationId;
use serde::{Deserialize, Serialize};

/// Two participants to seat at one table, or a bye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub player1: RegistrationId,
    pub player2: Option<RegistrationId>,
}

impl Pairing {
    pub fn new(player1: RegistrationId, player2: RegistrationId) -> Self {
        Self {
            player1,
            player2: Some(player2),
        }
    }

    pub fn bye(player1: RegistrationId) -> Self {
        Self {
            player1,
            player2: None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }
}

/// Pair index 0 with 1, 2 with 3, ...; an odd last participant gets a bye
pub fn pair_consecutively(participants: &[RegistrationId]) -> Vec<Pairing> {
    participants
        .chunks(2)
        .map(|chunk| Pairing {
            player1: chunk[0],
            player2: chunk.get(1).copied(),
        })
        .collect()
}
