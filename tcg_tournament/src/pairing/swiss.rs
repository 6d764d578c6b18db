//! Swiss pairing.

use super::{OrderingStrategy, Pairing, pair_consecutively};
use crate::registration::RegistrationId;
use crate::standings::StandingKey;
use std::collections::HashSet;

/// A participant as seen by the Swiss pairer
#[derive(Debug, Clone, PartialEq)]
pub struct SwissCandidate {
    /// Ranking key (points and tiebreakers from the last standings refresh)
    pub key: StandingKey,
    /// Already received a bye in an earlier round
    pub had_bye: bool,
    /// Opponents already faced
    pub opponents: HashSet<RegistrationId>,
}

impl SwissCandidate {
    pub fn id(&self) -> RegistrationId {
        self.key.registration_id
    }

    fn has_played(&self, other: &SwissCandidate) -> bool {
        self.opponents.contains(&other.id())
    }
}

/// First round: random order from `ordering`, then consecutive pairs
pub fn round_one(
    participants: &[RegistrationId],
    ordering: &mut dyn OrderingStrategy,
) -> Vec<Pairing> {
    let mut order = participants.to_vec();
    ordering.arrange(&mut order);
    pair_consecutively(&order)
}

/// Later rounds: rank by standing, then pair down the list.
///
/// With `avoid_rematches` off this is plain consecutive pairing of the
/// ranked list. With it on, each top-most unpaired participant meets the
/// highest-ranked unpaired participant they have not played yet (falling
/// back to the next in line when everyone left is a rematch), and the bye
/// goes to the lowest-ranked participant who has not had one.
pub fn pair_by_standing(
    mut candidates: Vec<SwissCandidate>,
    avoid_rematches: bool,
) -> Vec<Pairing> {
    candidates.sort_by(|a, b| a.key.cmp_rank(&b.key));

    if !avoid_rematches {
        let ids: Vec<RegistrationId> = candidates.iter().map(SwissCandidate::id).collect();
        return pair_consecutively(&ids);
    }

    let bye = if candidates.len() % 2 == 1 {
        let idx = candidates
            .iter()
            .rposition(|c| !c.had_bye)
            .unwrap_or(candidates.len() - 1);
        Some(candidates.remove(idx))
    } else {
        None
    };

    let mut pairings = Vec::with_capacity(candidates.len() / 2 + 1);
    while !candidates.is_empty() {
        let top = candidates.remove(0);
        if candidates.is_empty() {
            pairings.push(Pairing::bye(top.id()));
            break;
        }
        let idx = candidates
            .iter()
            .position(|c| !top.has_played(c))
            .unwrap_or(0);
        let opponent = candidates.remove(idx);
        pairings.push(Pairing::new(top.id(), opponent.id()));
    }

    if let Some(player) = bye {
        pairings.push(Pairing::bye(player.id()));
    }

    pairings
}
