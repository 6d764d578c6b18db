//! Participant registration models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registration ID type
pub type RegistrationId = i64;

/// Enrollment status of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Signed up, not checked in yet
    Registered,
    /// Checked in at the venue
    Confirmed,
    /// Withdrew before the start
    Cancelled,
    /// Did not show up
    NoShow,
    /// Removed by a judge
    Disqualified,
}

impl RegistrationStatus {
    /// Whether the participant is still eligible for pairing
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Registered | RegistrationStatus::Confirmed
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Registered => write!(f, "registered"),
            RegistrationStatus::Confirmed => write!(f, "confirmed"),
            RegistrationStatus::Cancelled => write!(f, "cancelled"),
            RegistrationStatus::NoShow => write!(f, "no_show"),
            RegistrationStatus::Disqualified => write!(f, "disqualified"),
        }
    }
}

/// Tournament statistics of a participant.
///
/// Always derived from the match history by the standings calculator,
/// never edited by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentStats {
    /// Matches won (byes included)
    pub wins: u32,
    /// Matches lost
    pub losses: u32,
    /// Matches drawn
    pub draws: u32,
    /// Byes received
    pub byes: u32,
    /// 3 per win, 1 per draw
    pub match_points: u32,
    /// Games won across all matches
    pub game_points: u32,
    /// Games played across all matches
    pub games_played: u32,
    /// Opponents' match-win percentage (0-100)
    pub opponent_match_win_pct: f64,
    /// Game-win percentage (0-100)
    pub game_win_pct: f64,
    /// Opponents' game-win percentage (0-100)
    pub opponent_game_win_pct: f64,
    /// Position in the latest standings refresh
    pub current_rank: Option<u32>,
}

impl TournamentStats {
    /// Matches with a recorded outcome
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

/// A participant's enrollment in a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration ID (unique within the tournament)
    pub id: RegistrationId,
    /// Platform user ID
    pub user_id: i64,
    /// Display name
    pub username: String,
    /// Current status
    pub status: RegistrationStatus,
    /// Checked in at the venue
    pub checked_in: bool,
    /// Check-in timestamp
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Seed assigned at tournament start
    pub seed_number: Option<u32>,
    /// Ranking frozen when the tournament finishes
    pub final_ranking: Option<u32>,
    /// Submitted decklist
    pub decklist: Option<String>,
    /// Reason recorded on disqualification
    pub disqualification_reason: Option<String>,
    /// Derived statistics
    pub stats: TournamentStats,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Create a new registration in the `Registered` state
    pub fn new(
        id: RegistrationId,
        user_id: i64,
        username: String,
        decklist: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            username,
            status: RegistrationStatus::Registered,
            checked_in: false,
            checked_in_at: None,
            seed_number: None,
            final_ranking: None,
            decklist,
            disqualification_reason: None,
            stats: TournamentStats::default(),
            registered_at: now,
        }
    }

    /// Whether the participant can still be paired
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Check the participant in.
    ///
    /// Returns `false` without touching anything when already checked in.
    /// A `Registered` participant becomes `Confirmed`.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> bool {
        if self.checked_in {
            return false;
        }

        self.checked_in = true;
        self.checked_in_at = Some(now);
        if self.status == RegistrationStatus::Registered {
            self.status = RegistrationStatus::Confirmed;
        }
        true
    }

    /// Flag the participant as disqualified
    pub fn disqualify(&mut self, reason: &str) {
        self.status = RegistrationStatus::Disqualified;
        self.disqualification_reason = Some(reason.to_string());
    }

    /// Percentage of matches won, computed from the win/loss/draw record
    pub fn record_win_percentage(&self) -> f64 {
        let played = self.stats.matches_played();
        if played == 0 {
            0.0
        } else {
            self.stats.wins as f64 / played as f64 * 100.0
        }
    }
}
