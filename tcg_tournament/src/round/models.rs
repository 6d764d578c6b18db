//! Round entity: a generation of matches played concurrently.

use super::errors::{RoundError, RoundResult};
use crate::matches::{Match, MatchId, MatchStatus};
use crate::pairing::Pairing;
use crate::registration::RegistrationId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round ID type
pub type RoundId = i64;

/// Round status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Finished,
    Cancelled,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "pending"),
            RoundStatus::Active => write!(f, "active"),
            RoundStatus::Finished => write!(f, "finished"),
            RoundStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Round type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    /// Score-based pairing, no elimination
    Swiss,
    /// Single-elimination playoff
    TopCut,
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundType::Swiss => write!(f, "swiss"),
            RoundType::TopCut => write!(f, "top_cut"),
        }
    }
}

/// A tournament round and the matches it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Round ID (unique within the tournament)
    pub id: RoundId,
    /// 1-based number, unique per round type
    pub number: u32,
    /// Swiss or top cut
    pub round_type: RoundType,
    /// Current status
    pub status: RoundStatus,
    /// Pairings have been generated
    pub pairings_generated: bool,
    /// Pairing timestamp
    pub pairings_generated_at: Option<DateTime<Utc>>,
    /// Time limit per match, in minutes
    pub time_limit_minutes: u32,
    /// Set once every match reached a terminal state
    pub all_matches_finished: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Start timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Finish timestamp
    pub finished_at: Option<DateTime<Utc>>,
    /// Matches, in table order
    pub matches: Vec<Match>,
}

impl Round {
    /// Create an empty pending round
    pub fn new(
        id: RoundId,
        number: u32,
        round_type: RoundType,
        time_limit_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number,
            round_type,
            status: RoundStatus::Pending,
            pairings_generated: false,
            pairings_generated_at: None,
            time_limit_minutes,
            all_matches_finished: false,
            created_at: now,
            started_at: None,
            finished_at: None,
            matches: Vec::new(),
        }
    }

    pub fn can_generate_pairings(&self) -> bool {
        self.status == RoundStatus::Pending && !self.pairings_generated
    }

    /// Materialize pairings as matches with sequential table numbers.
    ///
    /// Match IDs are taken from `first_match_id` upwards. Returns the number
    /// of matches created.
    pub fn apply_pairings(
        &mut self,
        pairings: &[Pairing],
        first_match_id: MatchId,
        now: DateTime<Utc>,
    ) -> RoundResult<usize> {
        if self.pairings_generated {
            return Err(RoundError::PairingsAlreadyGenerated(self.id));
        }
        if self.status != RoundStatus::Pending {
            return Err(self.invalid("generate pairings"));
        }

        self.matches = pairings
            .iter()
            .zip(first_match_id..)
            .map(|(pairing, id)| Match::new(id, self.id, pairing.player1, pairing.player2, now))
            .collect();

        for (table, m) in self.matches.iter_mut().enumerate() {
            m.table_number = Some(table as u32 + 1);
        }

        self.pairings_generated = true;
        self.pairings_generated_at = Some(now);
        Ok(self.matches.len())
    }

    pub fn can_start(&self) -> bool {
        self.status == RoundStatus::Pending && self.pairings_generated && !self.matches.is_empty()
    }

    /// Open the round for play
    pub fn start(&mut self, now: DateTime<Utc>) -> RoundResult<()> {
        if self.status != RoundStatus::Pending {
            return Err(self.invalid("start"));
        }
        if !self.pairings_generated {
            return Err(RoundError::PairingsMissing(self.id));
        }
        if self.matches.is_empty() {
            return Err(RoundError::NoMatches(self.id));
        }

        self.status = RoundStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// Every match is finished, a bye or cancelled
    pub fn check_all_matches_finished(&self) -> bool {
        self.matches.iter().all(|m| m.status.is_terminal())
    }

    /// Matches still waiting for a result
    pub fn unfinished_matches(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| !m.status.is_terminal())
            .count()
    }

    /// Close the round once every match is terminal
    pub fn finish(&mut self, now: DateTime<Utc>) -> RoundResult<()> {
        if self.status != RoundStatus::Active {
            return Err(self.invalid("finish"));
        }
        if !self.check_all_matches_finished() {
            return Err(RoundError::UnfinishedMatches {
                id: self.id,
                pending: self.unfinished_matches(),
            });
        }

        self.all_matches_finished = true;
        self.status = RoundStatus::Finished;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Close every unfinished match as 0-0 and finish the round.
    ///
    /// Returns the number of forced matches.
    pub fn force_finish(&mut self, reason: &str, now: DateTime<Utc>) -> RoundResult<usize> {
        if self.status != RoundStatus::Active {
            return Err(self.invalid("be force-finished"));
        }

        let mut forced = 0;
        for m in self.matches.iter_mut().filter(|m| !m.status.is_terminal()) {
            m.force_finish(reason, now)?;
            forced += 1;
        }

        self.finish(now)?;
        Ok(forced)
    }

    /// Cancel the round and every match not yet decided
    pub fn cancel(&mut self) -> RoundResult<()> {
        if !matches!(self.status, RoundStatus::Pending | RoundStatus::Active) {
            return Err(self.invalid("be cancelled"));
        }

        for m in self.matches.iter_mut().filter(|m| !m.status.is_terminal()) {
            m.cancel()?;
        }
        self.status = RoundStatus::Cancelled;
        Ok(())
    }

    /// Time elapsed since the round started
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at.map(|start| now - start)
    }

    /// Time left before the limit, negative once over time
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.elapsed(now)
            .map(|elapsed| Duration::minutes(self.time_limit_minutes as i64) - elapsed)
    }

    /// Active round running past its time limit. Informational only.
    pub fn is_overtime(&self, now: DateTime<Utc>) -> bool {
        self.status == RoundStatus::Active
            && self
                .remaining_time(now)
                .is_some_and(|remaining| remaining < Duration::zero())
    }

    /// Winners in table order; draws and cancelled matches are skipped
    pub fn winners(&self) -> Vec<RegistrationId> {
        let mut decided: Vec<&Match> = self
            .matches
            .iter()
            .filter(|m| m.status != MatchStatus::Cancelled)
            .collect();
        decided.sort_by_key(|m| m.table_number);
        decided.into_iter().filter_map(|m| m.winner).collect()
    }

    pub fn find_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn find_match_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.id == id)
    }

    fn invalid(&self, action: &'static str) -> RoundError {
        RoundError::InvalidState {
            id: self.id,
            action,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::pair_consecutively;

    fn paired_round(players: &[RegistrationId]) -> Round {
        let mut round = Round::new(1, 1, RoundType::Swiss, 50, Utc::now());
        round
            .apply_pairings(&pair_consecutively(players), 1, Utc::now())
            .unwrap();
        round
    }

    #[test]
    fn test_pairings_assign_sequential_tables() {
        let round = paired_round(&[1, 2, 3, 4, 5]);
        let tables: Vec<_> = round.matches.iter().map(|m| m.table_number).collect();
        assert_eq!(tables, vec![Some(1), Some(2), Some(3)]);
        assert!(round.pairings_generated);
        assert!(round.pairings_generated_at.is_some());
        assert_eq!(round.matches[2].status, MatchStatus::Bye);
    }

    #[test]
    fn test_pairings_only_once() {
        let mut round = paired_round(&[1, 2]);
        assert!(!round.can_generate_pairings());
        assert_eq!(
            round.apply_pairings(&pair_consecutively(&[1, 2]), 10, Utc::now()),
            Err(RoundError::PairingsAlreadyGenerated(1))
        );
    }

    #[test]
    fn test_start_requires_pairings() {
        let mut round = Round::new(1, 1, RoundType::Swiss, 50, Utc::now());
        assert!(!round.can_start());
        assert_eq!(
            round.start(Utc::now()),
            Err(RoundError::PairingsMissing(1))
        );
    }

    #[test]
    fn test_finish_gate() {
        let mut round = paired_round(&[1, 2, 3]);
        round.start(Utc::now()).unwrap();

        assert!(matches!(
            round.finish(Utc::now()),
            Err(RoundError::UnfinishedMatches { pending: 1, .. })
        ));
        assert!(!round.all_matches_finished);

        let m = round.find_match_mut(1).unwrap();
        m.start(Utc::now()).unwrap();
        m.finish(2, 0, Utc::now()).unwrap();

        round.finish(Utc::now()).unwrap();
        assert!(round.all_matches_finished);
        assert_eq!(round.status, RoundStatus::Finished);
    }

    #[test]
    fn test_force_finish_closes_open_matches() {
        let mut round = paired_round(&[1, 2, 3, 4]);
        round.start(Utc::now()).unwrap();
        round.find_match_mut(1).unwrap().start(Utc::now()).unwrap();

        let forced = round.force_finish("time", Utc::now()).unwrap();
        assert_eq!(forced, 2);
        assert_eq!(round.status, RoundStatus::Finished);
        assert!(round.matches.iter().all(|m| m.winner.is_none()));
    }

    #[test]
    fn test_overtime_detection() {
        let mut round = paired_round(&[1, 2]);
        let start = Utc::now();
        round.start(start).unwrap();

        assert!(!round.is_overtime(start + Duration::minutes(49)));
        assert!(round.is_overtime(start + Duration::minutes(51)));
    }

    #[test]
    fn test_winners_in_table_order() {
        let mut round = paired_round(&[1, 2, 3, 4, 5, 6]);
        round.start(Utc::now()).unwrap();
        for (id, score) in [(3, (0, 2)), (1, (2, 1)), (2, (1, 1))] {
            let m = round.find_match_mut(id).unwrap();
            m.start(Utc::now()).unwrap();
            m.finish(score.0, score.1, Utc::now()).unwrap();
        }

        assert_eq!(round.winners(), vec![1, 6]);
    }

    #[test]
    fn test_cancel_voids_open_matches() {
        let mut round = paired_round(&[1, 2, 3]);
        round.cancel().unwrap();
        assert_eq!(round.status, RoundStatus::Cancelled);
        assert_eq!(round.matches[0].status, MatchStatus::Cancelled);
        assert_eq!(round.matches[1].status, MatchStatus::Bye);
    }
}
