//! Standings calculator.
//!
//! Statistics are a fold over the match history: nothing is incremented in
//! place, so a corrected result is reflected by simply recomputing.

use crate::matches::{Match, MatchStatus};
use crate::registration::{Registration, RegistrationId, TournamentStats};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Points for a match win
pub const POINTS_PER_WIN: u32 = 3;

/// Points for a drawn match
pub const POINTS_PER_DRAW: u32 = 1;

/// Lowest percentage an opponent contributes to OMW% and OGW%
pub const TIEBREAKER_FLOOR: f64 = 1.0 / 3.0;

/// Everything the ranking order looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingKey {
    pub registration_id: RegistrationId,
    pub match_points: u32,
    pub opponent_match_win_pct: f64,
    pub game_win_pct: f64,
    pub opponent_game_win_pct: f64,
    pub seed_number: Option<u32>,
}

impl StandingKey {
    pub fn from_registration(registration: &Registration) -> Self {
        Self {
            registration_id: registration.id,
            match_points: registration.stats.match_points,
            opponent_match_win_pct: registration.stats.opponent_match_win_pct,
            game_win_pct: registration.stats.game_win_pct,
            opponent_game_win_pct: registration.stats.opponent_game_win_pct,
            seed_number: registration.seed_number,
        }
    }

    /// Ranking order: match points desc, OMW% desc, GW% desc, OGW% desc,
    /// then seed and registration ID ascending so the order is total.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        other
            .match_points
            .cmp(&self.match_points)
            .then_with(|| {
                other
                    .opponent_match_win_pct
                    .total_cmp(&self.opponent_match_win_pct)
            })
            .then_with(|| other.game_win_pct.total_cmp(&self.game_win_pct))
            .then_with(|| {
                other
                    .opponent_game_win_pct
                    .total_cmp(&self.opponent_game_win_pct)
            })
            .then_with(|| {
                self.seed_number
                    .unwrap_or(u32::MAX)
                    .cmp(&other.seed_number.unwrap_or(u32::MAX))
            })
            .then_with(|| self.registration_id.cmp(&other.registration_id))
    }
}

/// One line of the standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: u32,
    pub registration_id: RegistrationId,
    pub user_id: i64,
    pub username: String,
    pub seed_number: Option<u32>,
    pub match_points: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub opponent_match_win_pct: f64,
    pub game_win_pct: f64,
    pub opponent_game_win_pct: f64,
}

#[derive(Debug, Default)]
struct Record {
    wins: u32,
    losses: u32,
    draws: u32,
    byes: u32,
    games_won: u32,
    games_played: u32,
    opponents: Vec<RegistrationId>,
}

impl Record {
    fn match_points(&self) -> u32 {
        self.wins * POINTS_PER_WIN + self.draws * POINTS_PER_DRAW
    }

    fn match_win_ratio(&self) -> f64 {
        let played = self.wins + self.losses + self.draws;
        if played == 0 {
            0.0
        } else {
            self.match_points() as f64 / (played * POINTS_PER_WIN) as f64
        }
    }

    fn game_win_ratio(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.games_won as f64 / self.games_played as f64
        }
    }
}

fn tally(matches: &[&Match]) -> HashMap<RegistrationId, Record> {
    let mut records: HashMap<RegistrationId, Record> = HashMap::new();

    for m in matches {
        if !matches!(m.status, MatchStatus::Finished | MatchStatus::Bye) {
            continue;
        }

        let Some(player2) = m.player2 else {
            let record = records.entry(m.player1).or_default();
            record.wins += 1;
            record.byes += 1;
            record.games_won += m.player1_score;
            record.games_played += m.player1_score + m.player2_score;
            continue;
        };

        for (player, opponent) in [(m.player1, player2), (player2, m.player1)] {
            let (own, other) = m.games_for(player).unwrap_or_default();
            let record = records.entry(player).or_default();
            match m.winner {
                Some(winner) if winner == player => record.wins += 1,
                Some(_) => record.losses += 1,
                None => record.draws += 1,
            }
            record.games_won += own;
            record.games_played += own + other;
            record.opponents.push(opponent);
        }
    }

    records
}

fn floored_average(
    opponents: &[RegistrationId],
    records: &HashMap<RegistrationId, Record>,
    ratio: impl Fn(&Record) -> f64,
) -> f64 {
    if opponents.is_empty() {
        return 0.0;
    }
    let total: f64 = opponents
        .iter()
        .map(|id| records.get(id).map(&ratio).unwrap_or(0.0).max(TIEBREAKER_FLOOR))
        .sum();
    total / opponents.len() as f64 * 100.0
}

/// Derive every participant's statistics from finished matches and byes.
///
/// Byes count as a 2-0 win and are excluded from the opponent lists used
/// for OMW% and OGW%. Registrations without matches get zeroed stats.
/// `current_rank` is left unset.
pub fn compute_stats<'a>(
    registrations: &[Registration],
    matches: impl IntoIterator<Item = &'a Match>,
) -> HashMap<RegistrationId, TournamentStats> {
    let matches: Vec<&Match> = matches.into_iter().collect();
    let records = tally(&matches);

    registrations
        .iter()
        .map(|registration| {
            let stats = match records.get(&registration.id) {
                Some(record) => TournamentStats {
                    wins: record.wins,
                    losses: record.losses,
                    draws: record.draws,
                    byes: record.byes,
                    match_points: record.match_points(),
                    game_points: record.games_won,
                    games_played: record.games_played,
                    opponent_match_win_pct: floored_average(
                        &record.opponents,
                        &records,
                        Record::match_win_ratio,
                    ),
                    game_win_pct: record.game_win_ratio() * 100.0,
                    opponent_game_win_pct: floored_average(
                        &record.opponents,
                        &records,
                        Record::game_win_ratio,
                    ),
                    current_rank: None,
                },
                None => TournamentStats::default(),
            };
            (registration.id, stats)
        })
        .collect()
}

/// Rank the active registrations by their stored statistics
pub fn rank(registrations: &[Registration]) -> Vec<StandingEntry> {
    let mut active: Vec<&Registration> = registrations.iter().filter(|r| r.is_active()).collect();
    active.sort_by(|a, b| {
        StandingKey::from_registration(a).cmp_rank(&StandingKey::from_registration(b))
    });

    active
        .into_iter()
        .zip(1u32..)
        .map(|(registration, rank)| StandingEntry {
            rank,
            registration_id: registration.id,
            user_id: registration.user_id,
            username: registration.username.clone(),
            seed_number: registration.seed_number,
            match_points: registration.stats.match_points,
            wins: registration.stats.wins,
            losses: registration.stats.losses,
            draws: registration.stats.draws,
            opponent_match_win_pct: registration.stats.opponent_match_win_pct,
            game_win_pct: registration.stats.game_win_pct,
            opponent_game_win_pct: registration.stats.opponent_game_win_pct,
        })
        .collect()
}

/// Recompute statistics from `matches`, store them, and write `current_rank`.
///
/// Returns the fresh standings.
pub fn refresh<'a>(
    registrations: &mut [Registration],
    matches: impl IntoIterator<Item = &'a Match>,
) -> Vec<StandingEntry> {
    let mut stats = compute_stats(registrations, matches);
    for registration in registrations.iter_mut() {
        registration.stats = stats.remove(&registration.id).unwrap_or_default();
    }

    let standings = rank(registrations);
    for registration in registrations.iter_mut() {
        registration.stats.current_rank = standings
            .iter()
            .find(|entry| entry.registration_id == registration.id)
            .map(|entry| entry.rank);
    }

    standings
}
