//! Match entity and its lifecycle.

use super::errors::{MatchError, MatchResult};
use crate::registration::RegistrationId;
use crate::round::RoundId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Match ID type
pub type MatchId = i64;

/// Score recorded for the player receiving a bye
pub const BYE_SCORE: (u32, u32) = (2, 0);

/// Marker prepended to the note of a force-finished match
pub const FORCED_NOTE_PREFIX: &str = "[FORCÉ]";

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Paired, not started
    Pending,
    /// Being played
    InProgress,
    /// Result recorded
    Finished,
    /// Voided
    Cancelled,
    /// Automatic win, no opponent
    Bye,
}

impl MatchStatus {
    /// Whether nothing more can happen to the match
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Finished | MatchStatus::Cancelled | MatchStatus::Bye
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Finished => write!(f, "finished"),
            MatchStatus::Cancelled => write!(f, "cancelled"),
            MatchStatus::Bye => write!(f, "bye"),
        }
    }
}

/// Convert submitted scores into game counts
pub fn validate_scores(player1_score: i64, player2_score: i64) -> MatchResult<(u32, u32)> {
    let p1 = u32::try_from(player1_score).map_err(|_| MatchError::InvalidScore(player1_score))?;
    let p2 = u32::try_from(player2_score).map_err(|_| MatchError::InvalidScore(player2_score))?;
    Ok((p1, p2))
}

/// One game between two participants, or a bye
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID (unique within the tournament)
    pub id: MatchId,
    /// Owning round
    pub round_id: RoundId,
    /// First player (always present)
    pub player1: RegistrationId,
    /// Second player, `None` for a bye
    pub player2: Option<RegistrationId>,
    /// Current status
    pub status: MatchStatus,
    /// Games won by player 1
    pub player1_score: u32,
    /// Games won by player 2
    pub player2_score: u32,
    /// Winner, `None` for a draw or an undecided match
    pub winner: Option<RegistrationId>,
    /// Table assigned after pairing
    pub table_number: Option<u32>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Start timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Finish timestamp
    pub finished_at: Option<DateTime<Utc>>,
    /// Time between start and finish, in seconds
    pub duration_secs: Option<i64>,
    /// Judge notes (corrections, disqualifications, forced results)
    pub notes: Vec<String>,
}

impl Match {
    /// Create a match. Without a second player the match is an immediate bye.
    pub fn new(
        id: MatchId,
        round_id: RoundId,
        player1: RegistrationId,
        player2: Option<RegistrationId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut m = Self {
            id,
            round_id,
            player1,
            player2,
            status: MatchStatus::Pending,
            player1_score: 0,
            player2_score: 0,
            winner: None,
            table_number: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            duration_secs: None,
            notes: Vec::new(),
        };

        if player2.is_none() {
            m.status = MatchStatus::Bye;
            (m.player1_score, m.player2_score) = BYE_SCORE;
            m.winner = Some(player1);
            m.finished_at = Some(now);
        }

        m
    }

    /// Whether this match is a bye
    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    /// Whether the registration plays in this match
    pub fn involves(&self, player: RegistrationId) -> bool {
        self.player1 == player || self.player2 == Some(player)
    }

    /// Opponent of `player`, `None` for a bye or a stranger
    pub fn opponent_of(&self, player: RegistrationId) -> Option<RegistrationId> {
        if self.player1 == player {
            self.player2
        } else if self.player2 == Some(player) {
            Some(self.player1)
        } else {
            None
        }
    }

    /// Games won by `player` and by their opponent
    pub fn games_for(&self, player: RegistrationId) -> Option<(u32, u32)> {
        if self.player1 == player {
            Some((self.player1_score, self.player2_score))
        } else if self.player2 == Some(player) {
            Some((self.player2_score, self.player1_score))
        } else {
            None
        }
    }

    pub fn can_start(&self) -> bool {
        self.status == MatchStatus::Pending && !self.is_bye()
    }

    /// Begin play
    pub fn start(&mut self, now: DateTime<Utc>) -> MatchResult<()> {
        if !self.can_start() {
            return Err(self.invalid("start"));
        }

        self.status = MatchStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// A bye already carries its final result, so it counts as finishable
    pub fn can_finish(&self) -> bool {
        matches!(self.status, MatchStatus::InProgress | MatchStatus::Bye)
    }

    /// Record a played result.
    ///
    /// On a bye this is a no-op: its 2-0 result is fixed at creation.
    pub fn finish(
        &mut self,
        player1_score: u32,
        player2_score: u32,
        now: DateTime<Utc>,
    ) -> MatchResult<()> {
        if self.status == MatchStatus::Finished {
            return Err(MatchError::AlreadyReported(self.id));
        }
        if !self.can_finish() {
            return Err(self.invalid("finish"));
        }
        if self.is_bye() {
            return Ok(());
        }
        if player1_score == 0 && player2_score == 0 {
            return Err(MatchError::ScorelessResult);
        }

        self.record(player1_score, player2_score, now);
        Ok(())
    }

    /// Edit the result of a finished match.
    ///
    /// Returns whether the winner changed.
    pub fn correct_result(
        &mut self,
        player1_score: u32,
        player2_score: u32,
        note: &str,
    ) -> MatchResult<bool> {
        if self.status != MatchStatus::Finished || self.is_bye() {
            return Err(self.invalid("correct its result"));
        }
        if player1_score == 0 && player2_score == 0 {
            return Err(MatchError::ScorelessResult);
        }

        let previous_winner = self.winner;
        self.notes.push(format!(
            "Correction {}-{} -> {}-{}: {}",
            self.player1_score, self.player2_score, player1_score, player2_score, note
        ));
        self.player1_score = player1_score;
        self.player2_score = player2_score;
        self.winner = self.decide_winner(player1_score, player2_score);

        Ok(previous_winner != self.winner)
    }

    /// Award the match 2-0 to the opponent of `player`.
    ///
    /// Returns the opponent's registration ID.
    pub fn disqualify(
        &mut self,
        player: RegistrationId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> MatchResult<RegistrationId> {
        if !matches!(self.status, MatchStatus::Pending | MatchStatus::InProgress) {
            return Err(self.invalid("disqualify a player"));
        }
        let opponent = self.opponent_of(player).ok_or(MatchError::NotAParticipant {
            id: self.id,
            player,
        })?;

        let (p1, p2) = if player == self.player1 { (0, 2) } else { (2, 0) };
        self.record(p1, p2, now);
        self.notes
            .push(format!("Disqualification of registration {player}: {reason}"));
        Ok(opponent)
    }

    /// Close an unfinished match as a 0-0 draw (no result)
    pub fn force_finish(&mut self, reason: &str, now: DateTime<Utc>) -> MatchResult<()> {
        if !matches!(self.status, MatchStatus::Pending | MatchStatus::InProgress) {
            return Err(self.invalid("be force-finished"));
        }

        self.record(0, 0, now);
        self.notes.push(format!("{FORCED_NOTE_PREFIX} {reason}"));
        Ok(())
    }

    /// Void the match
    pub fn cancel(&mut self) -> MatchResult<()> {
        if !matches!(self.status, MatchStatus::Pending | MatchStatus::InProgress) {
            return Err(self.invalid("be cancelled"));
        }
        self.status = MatchStatus::Cancelled;
        Ok(())
    }

    /// Verify the winner agrees with the players and the scores
    pub fn check_consistency(&self) -> MatchResult<()> {
        let inconsistent = |reason: &str| MatchError::Inconsistent {
            id: self.id,
            reason: reason.to_string(),
        };

        if let Some(winner) = self.winner
            && !self.involves(winner)
        {
            return Err(inconsistent("winner is not a player of the match"));
        }

        match self.status {
            MatchStatus::Bye => {
                if self.player2.is_some() || self.winner != Some(self.player1) {
                    return Err(inconsistent("bye must be won by its only player"));
                }
            }
            MatchStatus::Finished => {
                if self.winner != self.decide_winner(self.player1_score, self.player2_score) {
                    return Err(inconsistent("winner does not match the scores"));
                }
            }
            _ => {
                if self.winner.is_some() {
                    return Err(inconsistent("unfinished match has a winner"));
                }
            }
        }

        Ok(())
    }

    fn decide_winner(&self, player1_score: u32, player2_score: u32) -> Option<RegistrationId> {
        match player1_score.cmp(&player2_score) {
            std::cmp::Ordering::Greater => Some(self.player1),
            std::cmp::Ordering::Less => self.player2,
            std::cmp::Ordering::Equal => None,
        }
    }

    fn record(&mut self, player1_score: u32, player2_score: u32, now: DateTime<Utc>) {
        self.player1_score = player1_score;
        self.player2_score = player2_score;
        self.winner = self.decide_winner(player1_score, player2_score);
        self.status = MatchStatus::Finished;
        self.finished_at = Some(now);
        self.duration_secs = self.started_at.map(|start| (now - start).num_seconds());
    }

    fn invalid(&self, action: &'static str) -> MatchError {
        MatchError::InvalidState {
            id: self.id,
            action,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending() -> Match {
        Match::new(1, 1, 10, Some(20), Utc::now())
    }

    fn in_progress() -> Match {
        let mut m = pending();
        m.start(Utc::now()).unwrap();
        m
    }

    #[test]
    fn test_bye_resolves_at_creation() {
        let m = Match::new(1, 1, 10, None, Utc::now());
        assert_eq!(m.status, MatchStatus::Bye);
        assert_eq!(m.winner, Some(10));
        assert_eq!((m.player1_score, m.player2_score), (2, 0));
        assert!(!m.can_start());
        assert!(m.can_finish());
        assert!(m.check_consistency().is_ok());
    }

    #[test]
    fn test_finish_on_bye_keeps_result() {
        let mut m = Match::new(1, 1, 10, None, Utc::now());
        m.finish(0, 2, Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Bye);
        assert_eq!(m.winner, Some(10));
    }

    #[test]
    fn test_start_requires_pending() {
        let mut m = in_progress();
        let err = m.start(Utc::now()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidState { action: "start", .. }));
    }

    #[test]
    fn test_finish_requires_in_progress() {
        let mut m = pending();
        assert!(!m.can_finish());
        assert!(matches!(
            m.finish(2, 1, Utc::now()),
            Err(MatchError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_finish_sets_winner_and_duration() {
        let mut m = pending();
        let start = Utc::now();
        m.start(start).unwrap();
        m.finish(2, 1, start + Duration::minutes(35)).unwrap();

        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.winner, Some(10));
        assert_eq!(m.duration_secs, Some(35 * 60));
        assert!(m.check_consistency().is_ok());
    }

    #[test]
    fn test_equal_scores_are_a_draw() {
        let mut m = in_progress();
        m.finish(1, 1, Utc::now()).unwrap();
        assert_eq!(m.winner, None);
        assert_eq!(m.status, MatchStatus::Finished);
    }

    #[test]
    fn test_scoreless_result_rejected() {
        let mut m = in_progress();
        assert_eq!(
            m.finish(0, 0, Utc::now()),
            Err(MatchError::ScorelessResult)
        );
        assert_eq!(m.status, MatchStatus::InProgress);
    }

    #[test]
    fn test_second_submission_conflicts() {
        let mut m = in_progress();
        m.finish(2, 0, Utc::now()).unwrap();
        assert_eq!(
            m.finish(0, 2, Utc::now()),
            Err(MatchError::AlreadyReported(1))
        );
        assert_eq!(m.winner, Some(10));
    }

    #[test]
    fn test_negative_scores_rejected() {
        assert_eq!(validate_scores(-1, 2), Err(MatchError::InvalidScore(-1)));
        assert_eq!(validate_scores(2, 1), Ok((2, 1)));
    }

    #[test]
    fn test_correction_reports_winner_change() {
        let mut m = in_progress();
        m.finish(2, 1, Utc::now()).unwrap();

        assert!(m.correct_result(1, 2, "slip signed wrong").unwrap());
        assert_eq!(m.winner, Some(20));
        assert!(!m.correct_result(0, 2, "game count").unwrap());
        assert_eq!(m.notes.len(), 2);
    }

    #[test]
    fn test_disqualification_awards_opponent() {
        let mut m = in_progress();
        let opponent = m.disqualify(10, "slow play", Utc::now()).unwrap();

        assert_eq!(opponent, 20);
        assert_eq!(m.winner, Some(20));
        assert_eq!((m.player1_score, m.player2_score), (0, 2));
        assert!(m.notes[0].contains("slow play"));
    }

    #[test]
    fn test_disqualification_of_stranger_rejected() {
        let mut m = in_progress();
        assert_eq!(
            m.disqualify(99, "x", Utc::now()),
            Err(MatchError::NotAParticipant { id: 1, player: 99 })
        );
    }

    #[test]
    fn test_force_finish_records_draw() {
        let mut m = in_progress();
        m.force_finish("round time exceeded", Utc::now()).unwrap();

        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!((m.player1_score, m.player2_score), (0, 0));
        assert_eq!(m.winner, None);
        assert!(m.notes[0].starts_with(FORCED_NOTE_PREFIX));
        assert!(m.check_consistency().is_ok());
    }

    #[test]
    fn test_inconsistent_winner_detected() {
        let mut m = in_progress();
        m.finish(2, 1, Utc::now()).unwrap();
        m.winner = Some(20);
        assert!(matches!(
            m.check_consistency(),
            Err(MatchError::Inconsistent { .. })
        ));
    }
}
