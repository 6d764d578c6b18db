//! Tournament aggregate and its settings.

use super::errors::{TournamentError, TournamentResult};
use crate::matches::{Match, MatchId};
use crate::registration::{Registration, RegistrationId};
use crate::round::{Round, RoundId, RoundStatus, RoundType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tournament ID type
pub type TournamentId = i64;

/// Default time limit per match, in minutes
pub const DEFAULT_MATCH_TIME_LIMIT_MINUTES: u32 = 50;

/// Default break between rounds, in minutes
pub const DEFAULT_BREAK_MINUTES: u32 = 10;

/// Metadata key holding the pause flag
pub const PAUSED_KEY: &str = "paused";

/// Metadata key holding the pause reason
pub const PAUSE_REASON_KEY: &str = "pause_reason";

/// Metadata key holding the pause timestamp
pub const PAUSED_AT_KEY: &str = "paused_at";

/// Tournament phase.
///
/// Declared in transition order so that `Ord` matches "only moves forward".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentPhase {
    /// Accepting registrations and check-ins
    Registration,
    /// Swiss rounds in progress
    Swiss,
    /// Single-elimination playoff in progress
    TopCut,
    /// Final rankings frozen
    Finished,
}

impl fmt::Display for TournamentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentPhase::Registration => write!(f, "registration"),
            TournamentPhase::Swiss => write!(f, "swiss"),
            TournamentPhase::TopCut => write!(f, "top_cut"),
            TournamentPhase::Finished => write!(f, "finished"),
        }
    }
}

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Swiss rounds, optionally followed by a top cut
    Swiss,
    SingleElimination,
    RoundRobin,
}

/// How the top-cut bracket size is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TopCutPolicy {
    /// Sized from the participant count at start
    Auto,
    /// Swiss only
    Disabled,
    /// Fixed bracket size (power of two, at least 2)
    Fixed { size: u32 },
}

/// Prize pool (informational only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    /// Total amount
    pub total: i64,
    /// Payouts by final rank (1st, 2nd, ...)
    pub payouts: Vec<i64>,
}

impl PrizePool {
    /// Payout for a 1-based final rank
    pub fn payout_for_rank(&self, rank: u32) -> Option<i64> {
        let idx = usize::try_from(rank).ok()?.checked_sub(1)?;
        self.payouts.get(idx).copied()
    }
}

/// Organizer-chosen tournament settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentSettings {
    pub format: TournamentFormat,
    /// Swiss round count; sized from the field at start when `None`
    pub swiss_rounds: Option<u32>,
    pub top_cut: TopCutPolicy,
    /// Time limit per match, in minutes; the engine default when `None`
    pub match_time_limit_minutes: Option<u32>,
    /// Break between rounds, in minutes
    pub break_minutes: u32,
    /// Registration cap
    pub max_participants: Option<u32>,
    /// A decklist must accompany each registration
    pub decklist_required: bool,
    /// Decklists are published once the tournament starts
    pub decklists_public: bool,
    pub prize_pool: Option<PrizePool>,
    /// Swiss pairing steers around earlier opponents
    pub avoid_rematches: bool,
    /// Rounds created by the controller are paired immediately
    pub auto_generate_pairings: bool,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            format: TournamentFormat::Swiss,
            swiss_rounds: None,
            top_cut: TopCutPolicy::Auto,
            match_time_limit_minutes: None,
            break_minutes: DEFAULT_BREAK_MINUTES,
            max_participants: None,
            decklist_required: false,
            decklists_public: false,
            prize_pool: None,
            avoid_rematches: false,
            auto_generate_pairings: true,
        }
    }
}

impl TournamentSettings {
    /// Reject settings the engine cannot run
    pub fn validate(&self) -> TournamentResult<()> {
        if self.format != TournamentFormat::Swiss {
            return Err(TournamentError::Validation(format!(
                "format {:?} is not supported, only Swiss with an optional top cut",
                self.format
            )));
        }
        if self.swiss_rounds == Some(0) {
            return Err(TournamentError::Validation(
                "swiss_rounds must be at least 1".to_string(),
            ));
        }
        if let TopCutPolicy::Fixed { size } = self.top_cut
            && (size < 2 || !size.is_power_of_two())
        {
            return Err(TournamentError::Validation(format!(
                "top cut size {size} must be a power of two of at least 2"
            )));
        }
        if self.match_time_limit_minutes == Some(0) {
            return Err(TournamentError::Validation(
                "match_time_limit_minutes must be positive".to_string(),
            ));
        }
        if self.max_participants.is_some_and(|max| max < 2) {
            return Err(TournamentError::Validation(
                "max_participants must allow at least 2 players".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective time limit per match, in minutes
    pub fn match_time_limit(&self) -> u32 {
        self.match_time_limit_minutes
            .unwrap_or(DEFAULT_MATCH_TIME_LIMIT_MINUTES)
    }
}

/// The unit of consistency: a tournament with its registrations, rounds and
/// matches. Every mutation replaces the whole aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: Option<String>,
    /// User managing the tournament
    pub organizer_id: i64,
    pub location: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub settings: TournamentSettings,
    pub phase: TournamentPhase,
    /// Rounds created so far, Swiss and top cut together; never decreases
    pub current_round: u32,
    /// Swiss round count resolved at start
    pub swiss_rounds: u32,
    /// Bracket size resolved at start, `None` for no top cut
    pub top_cut_size: Option<u32>,
    pub approved: bool,
    pub registrations: Vec<Registration>,
    /// Rounds in creation order
    pub rounds: Vec<Round>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Free-form administrative data (pause state lives here)
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optimistic concurrency version, bumped on every save
    pub version: i64,
    pub(crate) next_registration_id: RegistrationId,
    pub(crate) next_round_id: RoundId,
    pub(crate) next_match_id: MatchId,
}

impl Tournament {
    /// Create a tournament in the registration phase
    pub fn new(
        id: TournamentId,
        name: String,
        organizer_id: i64,
        settings: TournamentSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description: None,
            organizer_id,
            location: None,
            scheduled_start: None,
            settings,
            phase: TournamentPhase::Registration,
            current_round: 0,
            swiss_rounds: 0,
            top_cut_size: None,
            approved: false,
            registrations: Vec::new(),
            rounds: Vec::new(),
            created_at: now,
            started_at: None,
            finished_at: None,
            metadata: BTreeMap::new(),
            version: 0,
            next_registration_id: 1,
            next_round_id: 1,
            next_match_id: 1,
        }
    }

    pub fn round(&self, id: RoundId) -> TournamentResult<&Round> {
        self.rounds
            .iter()
            .find(|r| r.id == id)
            .ok_or(TournamentError::RoundNotFound(id))
    }

    pub fn round_mut(&mut self, id: RoundId) -> TournamentResult<&mut Round> {
        self.rounds
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(TournamentError::RoundNotFound(id))
    }

    /// Round holding the match, with the match itself
    pub fn find_match(&self, id: MatchId) -> TournamentResult<(&Round, &Match)> {
        self.rounds
            .iter()
            .find_map(|r| r.find_match(id).map(|m| (r, m)))
            .ok_or(TournamentError::MatchNotFound(id))
    }

    pub fn registration(&self, id: RegistrationId) -> TournamentResult<&Registration> {
        crate::registration::find_registration(&self.registrations, id)
            .ok_or(TournamentError::RegistrationNotFound(id))
    }

    pub fn registration_mut(&mut self, id: RegistrationId) -> TournamentResult<&mut Registration> {
        crate::registration::find_registration_mut(&mut self.registrations, id)
            .ok_or(TournamentError::RegistrationNotFound(id))
    }

    /// Latest round that is neither finished nor cancelled
    pub fn active_round(&self) -> Option<&Round> {
        self.rounds
            .iter()
            .rev()
            .find(|r| matches!(r.status, RoundStatus::Pending | RoundStatus::Active))
    }

    /// Rounds of one type, in number order
    pub fn rounds_of(&self, round_type: RoundType) -> impl Iterator<Item = &Round> {
        self.rounds.iter().filter(move |r| r.round_type == round_type)
    }

    /// Number of the latest bracket round, `None` before the top cut
    pub fn current_top_cut_round(&self) -> Option<u32> {
        self.rounds_of(RoundType::TopCut).map(|r| r.number).max()
    }

    /// Every match of every round
    pub fn all_matches(&self) -> impl Iterator<Item = &Match> {
        self.rounds.iter().flat_map(|r| r.matches.iter())
    }

    /// Whether a top-cut phase follows the Swiss rounds
    pub fn needs_top_cut(&self) -> bool {
        self.top_cut_size.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.metadata
            .get(PAUSED_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> TournamentSnapshot {
        TournamentSnapshot::from(self)
    }

    pub(crate) fn allocate_registration_id(&mut self) -> RegistrationId {
        let id = self.next_registration_id;
        self.next_registration_id += 1;
        id
    }

    pub(crate) fn allocate_round_id(&mut self) -> RoundId {
        let id = self.next_round_id;
        self.next_round_id += 1;
        id
    }

    /// Reserve `count` consecutive match IDs and return the first
    pub(crate) fn allocate_match_ids(&mut self, count: usize) -> MatchId {
        let first = self.next_match_id;
        self.next_match_id += count as MatchId;
        first
    }
}

/// Round summary for snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub id: RoundId,
    pub number: u32,
    pub round_type: RoundType,
    pub status: RoundStatus,
    pub pairings_generated: bool,
    pub matches: usize,
    pub unfinished_matches: usize,
}

/// Authoritative state returned alongside every reply and rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSnapshot {
    pub id: TournamentId,
    pub name: String,
    pub organizer_id: i64,
    pub phase: TournamentPhase,
    pub current_round: u32,
    /// Bracket round in play, `None` before the top cut
    pub top_cut_round: Option<u32>,
    pub swiss_rounds: u32,
    pub top_cut_size: Option<u32>,
    pub approved: bool,
    pub paused: bool,
    pub active_participants: usize,
    pub rounds: Vec<RoundSummary>,
    pub version: i64,
}

impl From<&Tournament> for TournamentSnapshot {
    fn from(t: &Tournament) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            organizer_id: t.organizer_id,
            phase: t.phase,
            current_round: t.current_round,
            top_cut_round: t.current_top_cut_round(),
            swiss_rounds: t.swiss_rounds,
            top_cut_size: t.top_cut_size,
            approved: t.approved,
            paused: t.is_paused(),
            active_participants: t.registrations.iter().filter(|r| r.is_active()).count(),
            rounds: t
                .rounds
                .iter()
                .map(|r| RoundSummary {
                    id: r.id,
                    number: r.number,
                    round_type: r.round_type,
                    status: r.status,
                    pairings_generated: r.pairings_generated,
                    matches: r.matches.len(),
                    unfinished_matches: r.unfinished_matches(),
                })
                .collect(),
            version: t.version,
        }
    }
}
