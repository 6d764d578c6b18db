//! Tournament state machine: REGISTRATION -> SWISS -> TOP_CUT -> FINISHED.
//!
//! Every operation mutates the aggregate in place and either succeeds fully
//! or returns an error. Callers that need all-or-nothing semantics apply the
//! operation to a clone and keep it only on success (see
//! [`crate::engine::TournamentActor`]).

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    PAUSE_REASON_KEY, PAUSED_AT_KEY, PAUSED_KEY, TopCutPolicy, Tournament, TournamentPhase,
};
use crate::matches::{Match, MatchId, MatchStatus, validate_scores};
use crate::pairing::{
    self, OrderingStrategy, Pairing, SwissCandidate, effective_cut_size, seeded_bracket,
};
use crate::registration::{
    Registration, RegistrationId, RegistrationStatus, assign_seed_numbers,
    find_confirmed_participants,
};
use crate::round::{Round, RoundError, RoundId, RoundStatus, RoundType};
use crate::standings::{self, StandingEntry, StandingKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum active participants to start
pub const MIN_PARTICIPANTS: usize = 2;

/// Swiss round count for a field of `participants`
pub fn swiss_rounds_for(participants: usize) -> u32 {
    match participants {
        0..=8 => 3,
        9..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        65..=128 => 7,
        _ => 8,
    }
}

/// Top-cut size for a field of `participants`, `None` for small fields
pub fn auto_top_cut_size(participants: usize) -> Option<u32> {
    match participants {
        32.. => Some(8),
        16.. => Some(4),
        _ => None,
    }
}

/// Result of [`Tournament::start`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub phase: TournamentPhase,
    pub swiss_rounds: u32,
    pub top_cut_size: Option<u32>,
    pub first_round_id: RoundId,
    pub participants: usize,
}

/// Result of a match correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    #[serde(rename = "match")]
    pub corrected: Match,
    pub winner_changed: bool,
}

/// Result of a disqualification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisqualificationOutcome {
    #[serde(rename = "match")]
    pub forfeited: Match,
    pub disqualified: RegistrationId,
    pub awarded_to: RegistrationId,
}

/// What happened after a round closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum NextStep {
    /// Another Swiss round was created
    NextSwissRound { round_id: RoundId, number: u32 },
    /// Swiss rounds are over and the bracket's first round was created
    TopCutStarted { round_id: RoundId, size: u32 },
    /// Next bracket round was created
    NextTopCutRound { round_id: RoundId, number: u32 },
    /// Final rankings are frozen
    TournamentFinished,
}

/// Result of finishing (or force-finishing) a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundAdvance {
    pub round_id: RoundId,
    /// Matches closed 0-0 by a forced finish
    pub forced_matches: usize,
    pub next: NextStep,
    pub phase: TournamentPhase,
    pub standings: Vec<StandingEntry>,
}

impl Tournament {
    /// Allow the tournament to start
    pub fn approve(&mut self) -> TournamentResult<bool> {
        self.require_phase(TournamentPhase::Registration, "approve")?;
        let changed = !self.approved;
        self.approved = true;
        Ok(changed)
    }

    /// Enroll a user
    pub fn register(
        &mut self,
        user_id: i64,
        username: String,
        decklist: Option<String>,
        now: DateTime<Utc>,
    ) -> TournamentResult<Registration> {
        self.require_phase(TournamentPhase::Registration, "register")?;

        if username.trim().is_empty() {
            return Err(TournamentError::Validation(
                "username cannot be empty".to_string(),
            ));
        }
        let decklist = decklist.filter(|d| !d.trim().is_empty());
        if self.settings.decklist_required && decklist.is_none() {
            return Err(TournamentError::Validation(
                "a decklist is required for this tournament".to_string(),
            ));
        }
        if self
            .registrations
            .iter()
            .any(|r| r.user_id == user_id && r.status != RegistrationStatus::Cancelled)
        {
            return Err(TournamentError::AlreadyRegistered(user_id));
        }
        if let Some(max) = self.settings.max_participants {
            let active = find_confirmed_participants(&self.registrations).len();
            if active >= max as usize {
                return Err(TournamentError::TournamentFull(max));
            }
        }

        let id = self.allocate_registration_id();
        let registration = Registration::new(id, user_id, username, decklist, now);
        self.registrations.push(registration.clone());

        log::info!(
            "User {} registered for tournament {} (registration {})",
            user_id,
            self.id,
            id
        );
        Ok(registration)
    }

    /// Check a participant in. A second call changes nothing.
    pub fn check_in(
        &mut self,
        registration_id: RegistrationId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Registration> {
        self.require_phase(TournamentPhase::Registration, "check in")?;
        let registration = self.registration_mut(registration_id)?;
        if !registration.is_active() {
            return Err(TournamentError::InvalidState(format!(
                "registration {} is {}",
                registration_id, registration.status
            )));
        }

        if registration.check_in(now) {
            log::debug!("Registration {} checked in", registration_id);
        }
        Ok(registration.clone())
    }

    /// Withdraw a registration before the start
    pub fn cancel_registration(
        &mut self,
        registration_id: RegistrationId,
    ) -> TournamentResult<Registration> {
        self.set_inactive(registration_id, RegistrationStatus::Cancelled)
    }

    /// Flag a participant who did not show up
    pub fn mark_no_show(&mut self, registration_id: RegistrationId) -> TournamentResult<Registration> {
        self.set_inactive(registration_id, RegistrationStatus::NoShow)
    }

    fn set_inactive(
        &mut self,
        registration_id: RegistrationId,
        status: RegistrationStatus,
    ) -> TournamentResult<Registration> {
        self.require_phase(TournamentPhase::Registration, "withdraw a registration")?;
        let registration = self.registration_mut(registration_id)?;
        if !registration.is_active() {
            return Err(TournamentError::InvalidState(format!(
                "registration {} is already {}",
                registration_id, registration.status
            )));
        }
        registration.status = status;
        Ok(registration.clone())
    }

    /// Phase is REGISTRATION, approved, and enough active participants
    pub fn can_start(&self) -> bool {
        self.phase == TournamentPhase::Registration
            && self.approved
            && find_confirmed_participants(&self.registrations).len() >= MIN_PARTICIPANTS
    }

    /// Seed the field, size the event and open Swiss round 1
    pub fn start(
        &mut self,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<StartOutcome> {
        self.require_phase(TournamentPhase::Registration, "start")?;
        if !self.approved {
            return Err(TournamentError::InvalidState(format!(
                "tournament {} has not been approved",
                self.id
            )));
        }
        let participants = find_confirmed_participants(&self.registrations).len();
        if participants < MIN_PARTICIPANTS {
            return Err(TournamentError::InsufficientPlayers {
                needed: MIN_PARTICIPANTS,
                current: participants,
            });
        }

        assign_seed_numbers(&mut self.registrations, ordering);
        self.advance_phase(TournamentPhase::Swiss)?;
        self.started_at = Some(now);
        self.swiss_rounds = self
            .settings
            .swiss_rounds
            .unwrap_or_else(|| swiss_rounds_for(participants));
        self.top_cut_size = self.resolve_top_cut(participants);

        let first_round_id = self.create_round(RoundType::Swiss, ordering, now)?;
        self.refresh_standings();

        log::info!(
            "Tournament {} started: {} participants, {} Swiss rounds, top cut {:?}",
            self.id,
            participants,
            self.swiss_rounds,
            self.top_cut_size
        );

        Ok(StartOutcome {
            phase: self.phase,
            swiss_rounds: self.swiss_rounds,
            top_cut_size: self.top_cut_size,
            first_round_id,
            participants,
        })
    }

    fn resolve_top_cut(&self, participants: usize) -> Option<u32> {
        match self.settings.top_cut {
            TopCutPolicy::Auto => auto_top_cut_size(participants),
            TopCutPolicy::Disabled => None,
            TopCutPolicy::Fixed { size } => {
                let effective = effective_cut_size(size, participants);
                if effective != Some(size) {
                    log::warn!(
                        "Tournament {}: top cut of {} reduced to {:?} for {} participants",
                        self.id,
                        size,
                        effective,
                        participants
                    );
                }
                effective
            }
        }
    }

    /// Pair a pending round and create its matches
    pub fn generate_pairings(
        &mut self,
        round_id: RoundId,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Match>> {
        let round = self.round(round_id)?;
        if round.pairings_generated {
            return Err(RoundError::PairingsAlreadyGenerated(round_id).into());
        }
        if !round.can_generate_pairings() {
            return Err(TournamentError::InvalidState(format!(
                "round {} is {}, pairings can only be generated for a pending round",
                round_id, round.status
            )));
        }

        let (round_type, number) = (round.round_type, round.number);
        let pairings = self.compute_pairings(round_type, number, ordering)?;
        if pairings.is_empty() {
            return Err(TournamentError::InvalidState(format!(
                "no participants left to pair in round {round_id}"
            )));
        }

        let first_match_id = self.allocate_match_ids(pairings.len());
        let round = self.round_mut(round_id)?;
        round.apply_pairings(&pairings, first_match_id, now)?;
        let matches = round.matches.clone();

        log::info!(
            "Tournament {}: {} round {} paired into {} matches",
            self.id,
            round_type,
            number,
            matches.len()
        );
        self.verify_matches()?;
        Ok(matches)
    }

    fn compute_pairings(
        &self,
        round_type: RoundType,
        number: u32,
        ordering: &mut dyn OrderingStrategy,
    ) -> TournamentResult<Vec<Pairing>> {
        let pairings = match (round_type, number) {
            (RoundType::Swiss, 1) => {
                let mut field = find_confirmed_participants(&self.registrations);
                field.sort_by_key(|r| (r.seed_number.unwrap_or(u32::MAX), r.id));
                let ids: Vec<RegistrationId> = field.iter().map(|r| r.id).collect();
                pairing::round_one(&ids, ordering)
            }
            (RoundType::Swiss, _) => {
                let candidates = find_confirmed_participants(&self.registrations)
                    .into_iter()
                    .map(|r| self.swiss_candidate(r))
                    .collect();
                pairing::pair_by_standing(candidates, self.settings.avoid_rematches)
            }
            (RoundType::TopCut, 1) => {
                let size = self.top_cut_size.ok_or_else(|| {
                    TournamentError::InvalidState(format!(
                        "tournament {} has no top cut",
                        self.id
                    ))
                })?;
                let ranked: Vec<RegistrationId> = standings::rank(&self.registrations)
                    .iter()
                    .map(|entry| entry.registration_id)
                    .collect();
                seeded_bracket(&ranked, size as usize)
            }
            (RoundType::TopCut, _) => {
                let previous = self
                    .rounds_of(RoundType::TopCut)
                    .find(|r| r.number == number - 1)
                    .ok_or_else(|| {
                        TournamentError::InvalidState(format!(
                            "top cut round {} has no previous round",
                            number
                        ))
                    })?;
                let winners: Vec<RegistrationId> = previous
                    .winners()
                    .into_iter()
                    .filter(|id| self.registration(*id).is_ok_and(Registration::is_active))
                    .collect();
                pairing::advance_winners(&winners)
            }
        };
        Ok(pairings)
    }

    fn swiss_candidate(&self, registration: &Registration) -> SwissCandidate {
        let mut had_bye = false;
        let mut opponents = HashSet::new();
        for m in self.all_matches().filter(|m| m.involves(registration.id)) {
            match m.opponent_of(registration.id) {
                Some(opponent) => {
                    opponents.insert(opponent);
                }
                None => had_bye |= m.status == MatchStatus::Bye,
            }
        }

        SwissCandidate {
            key: StandingKey::from_registration(registration),
            had_bye,
            opponents,
        }
    }

    /// Open a paired round for play
    pub fn start_round(&mut self, round_id: RoundId, now: DateTime<Utc>) -> TournamentResult<Round> {
        self.require_running("start a round")?;
        let round = self.round_mut(round_id)?;
        round.start(now)?;
        log::info!("Round {} ({} #{}) started", round.id, round.round_type, round.number);
        Ok(round.clone())
    }

    /// Begin play at one table
    pub fn start_match(&mut self, match_id: MatchId, now: DateTime<Utc>) -> TournamentResult<Match> {
        let m = self.active_match_mut(match_id, "start a match")?;
        m.start(now)?;
        Ok(m.clone())
    }

    /// Record a played result. The first submission wins; later ones conflict.
    pub fn submit_result(
        &mut self,
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match> {
        let (s1, s2) = validate_scores(player1_score, player2_score)?;
        self.require_decisive(match_id, s1, s2)?;
        let m = self.active_match_mut(match_id, "submit a result")?;
        m.finish(s1, s2, now)?;
        let finished = m.clone();

        self.verify_matches()?;
        self.refresh_standings();
        log::info!(
            "Match {} finished {}-{}, winner {:?}",
            finished.id,
            finished.player1_score,
            finished.player2_score,
            finished.winner
        );
        Ok(finished)
    }

    /// Edit a finished result; statistics are recomputed from the history
    pub fn correct_result(
        &mut self,
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
        note: &str,
    ) -> TournamentResult<CorrectionOutcome> {
        if self.phase == TournamentPhase::Finished {
            return Err(TournamentError::InvalidState(format!(
                "tournament {} is finished, rankings are frozen",
                self.id
            )));
        }
        if note.trim().is_empty() {
            return Err(TournamentError::Validation(
                "a correction requires a note".to_string(),
            ));
        }
        let (s1, s2) = validate_scores(player1_score, player2_score)?;
        self.require_decisive(match_id, s1, s2)?;

        let (round, current) = self.find_match(match_id)?;
        if round.round_type == RoundType::TopCut && round.status == RoundStatus::Finished {
            let new_winner = if s1 > s2 {
                Some(current.player1)
            } else {
                current.player2
            };
            if new_winner != current.winner {
                return Err(TournamentError::InvalidState(format!(
                    "match {match_id} belongs to a closed bracket round, its winner cannot change"
                )));
            }
        }
        let round_id = round.id;

        let m = self
            .round_mut(round_id)?
            .find_match_mut(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let winner_changed = m.correct_result(s1, s2, note)?;
        let corrected = m.clone();

        self.verify_matches()?;
        self.refresh_standings();
        log::info!(
            "Match {} corrected to {}-{} (winner changed: {})",
            match_id,
            s1,
            s2,
            winner_changed
        );
        Ok(CorrectionOutcome {
            corrected,
            winner_changed,
        })
    }

    /// Forfeit the match 2-0 against `registration_id` and disqualify them
    pub fn disqualify_player(
        &mut self,
        match_id: MatchId,
        registration_id: RegistrationId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> TournamentResult<DisqualificationOutcome> {
        self.require_running("disqualify a player")?;
        if reason.trim().is_empty() {
            return Err(TournamentError::Validation(
                "a disqualification requires a reason".to_string(),
            ));
        }

        let (round, _) = self.find_match(match_id)?;
        let round_id = round.id;
        let m = self
            .round_mut(round_id)?
            .find_match_mut(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let awarded_to = m.disqualify(registration_id, reason, now)?;
        let forfeited = m.clone();

        self.registration_mut(registration_id)?.disqualify(reason);
        self.verify_matches()?;
        self.refresh_standings();

        log::warn!(
            "Registration {} disqualified in match {}: {}",
            registration_id,
            match_id,
            reason
        );
        Ok(DisqualificationOutcome {
            forfeited,
            disqualified: registration_id,
            awarded_to,
        })
    }

    /// Close a round whose matches are all done, then move the event on
    pub fn finish_round(
        &mut self,
        round_id: RoundId,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<RoundAdvance> {
        self.require_running("finish a round")?;
        self.round_mut(round_id)?.finish(now)?;
        self.advance_after(round_id, 0, ordering, now)
    }

    /// Close every unfinished match 0-0, finish the round and move on
    pub fn force_finish_round(
        &mut self,
        round_id: RoundId,
        reason: &str,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<RoundAdvance> {
        self.require_running("force-finish a round")?;
        if reason.trim().is_empty() {
            return Err(TournamentError::Validation(
                "a forced finish requires a reason".to_string(),
            ));
        }

        let round = self.round(round_id)?;
        if round.round_type == RoundType::TopCut {
            let undecided = round
                .matches
                .iter()
                .filter(|m| !m.status.is_terminal())
                .count();
            if undecided > 0 {
                return Err(TournamentError::InvalidState(format!(
                    "top-cut round {round_id} has {undecided} undecided match(es); \
                     report or disqualify before closing it"
                )));
            }
        }

        let forced = self.round_mut(round_id)?.force_finish(reason, now)?;
        self.verify_matches()?;
        log::warn!(
            "Round {} force-finished with {} open match(es): {}",
            round_id,
            forced,
            reason
        );
        self.advance_after(round_id, forced, ordering, now)
    }

    /// Top-cut matches eliminate the loser and cannot end level
    fn require_decisive(&self, match_id: MatchId, s1: u32, s2: u32) -> TournamentResult<()> {
        let (round, _) = self.find_match(match_id)?;
        if round.round_type == RoundType::TopCut && s1 == s2 {
            return Err(TournamentError::Validation(format!(
                "match {match_id} is a top-cut match and needs a winner, {s1}-{s2} is level"
            )));
        }
        Ok(())
    }

    fn advance_after(
        &mut self,
        round_id: RoundId,
        forced_matches: usize,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<RoundAdvance> {
        let standings = self.refresh_standings();
        let round = self.round(round_id)?;
        let (round_type, number) = (round.round_type, round.number);
        let winners = round.winners();

        let next = match round_type {
            RoundType::Swiss if number < self.swiss_rounds => {
                let round_id = self.create_round(RoundType::Swiss, ordering, now)?;
                NextStep::NextSwissRound {
                    round_id,
                    number: number + 1,
                }
            }
            RoundType::Swiss => match self.top_cut_size {
                Some(size) => {
                    self.advance_phase(TournamentPhase::TopCut)?;
                    let round_id = self.create_round(RoundType::TopCut, ordering, now)?;
                    NextStep::TopCutStarted { round_id, size }
                }
                None => {
                    self.finish(now)?;
                    NextStep::TournamentFinished
                }
            },
            RoundType::TopCut => {
                let remaining = winners
                    .into_iter()
                    .filter(|id| self.registration(*id).is_ok_and(Registration::is_active))
                    .count();
                if remaining > 1 {
                    let round_id = self.create_round(RoundType::TopCut, ordering, now)?;
                    NextStep::NextTopCutRound {
                        round_id,
                        number: number + 1,
                    }
                } else {
                    self.finish(now)?;
                    NextStep::TournamentFinished
                }
            }
        };

        log::info!("Tournament {}: round {} closed, next {:?}", self.id, round_id, next);
        Ok(RoundAdvance {
            round_id,
            forced_matches,
            next,
            phase: self.phase,
            standings,
        })
    }

    fn create_round(
        &mut self,
        round_type: RoundType,
        ordering: &mut dyn OrderingStrategy,
        now: DateTime<Utc>,
    ) -> TournamentResult<RoundId> {
        let number = self.rounds_of(round_type).count() as u32 + 1;
        let overall = self.rounds.len() as u32 + 1;
        if overall <= self.current_round {
            return Err(TournamentError::InvariantViolation(format!(
                "round counter would go back from {} to {}",
                self.current_round, overall
            )));
        }

        let id = self.allocate_round_id();
        self.rounds.push(Round::new(
            id,
            number,
            round_type,
            self.settings.match_time_limit(),
            now,
        ));
        self.current_round = overall;

        if self.settings.auto_generate_pairings {
            self.generate_pairings(id, ordering, now)?;
        }
        Ok(id)
    }

    /// Ranked standings from the last refresh
    pub fn standings(&self) -> Vec<StandingEntry> {
        standings::rank(&self.registrations)
    }

    /// Recompute every participant's statistics from the match history
    pub fn refresh_standings(&mut self) -> Vec<StandingEntry> {
        standings::refresh(
            &mut self.registrations,
            self.rounds.iter().flat_map(|r| r.matches.iter()),
        )
    }

    /// Freeze final rankings. Rounds still open are cancelled.
    pub fn finish(&mut self, now: DateTime<Utc>) -> TournamentResult<Vec<StandingEntry>> {
        self.require_running("finish")?;

        for round in self
            .rounds
            .iter_mut()
            .filter(|r| matches!(r.status, RoundStatus::Pending | RoundStatus::Active))
        {
            log::warn!("Cancelling open round {} at tournament finish", round.id);
            round.cancel()?;
        }

        let standings = self.refresh_standings();
        for registration in self.registrations.iter_mut() {
            registration.final_ranking = registration.stats.current_rank;
        }
        self.advance_phase(TournamentPhase::Finished)?;
        self.finished_at = Some(now);

        log::info!(
            "Tournament {} finished, winner: {:?}",
            self.id,
            standings.first().map(|s| s.username.as_str())
        );
        Ok(standings)
    }

    /// Mark the tournament paused. Advisory only: nothing is blocked.
    pub fn pause(&mut self, reason: Option<String>, now: DateTime<Utc>) -> TournamentResult<bool> {
        if self.phase == TournamentPhase::Finished {
            return Err(TournamentError::InvalidState(format!(
                "tournament {} is finished",
                self.id
            )));
        }
        if self.is_paused() {
            return Ok(false);
        }

        self.metadata.insert(PAUSED_KEY.to_string(), true.into());
        self.metadata
            .insert(PAUSED_AT_KEY.to_string(), now.to_rfc3339().into());
        if let Some(reason) = reason {
            self.metadata.insert(PAUSE_REASON_KEY.to_string(), reason.into());
        }
        Ok(true)
    }

    pub fn resume(&mut self) -> TournamentResult<bool> {
        if !self.is_paused() {
            return Ok(false);
        }
        self.metadata.insert(PAUSED_KEY.to_string(), false.into());
        self.metadata.remove(PAUSED_AT_KEY);
        self.metadata.remove(PAUSE_REASON_KEY);
        Ok(true)
    }

    /// Active rounds past their time limit
    pub fn overtime_rounds(&self, now: DateTime<Utc>) -> Vec<RoundId> {
        self.rounds
            .iter()
            .filter(|r| r.is_overtime(now))
            .map(|r| r.id)
            .collect()
    }

    /// Check every match's winner against its players and scores
    pub fn verify_matches(&self) -> TournamentResult<()> {
        for m in self.all_matches() {
            if let Err(err) = m.check_consistency() {
                log::error!("Tournament {}: {}", self.id, err);
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn active_match_mut(
        &mut self,
        match_id: MatchId,
        operation: &str,
    ) -> TournamentResult<&mut Match> {
        self.require_running(operation)?;
        let (round, _) = self.find_match(match_id)?;
        if round.status != RoundStatus::Active {
            return Err(TournamentError::InvalidState(format!(
                "cannot {} in round {} while it is {}",
                operation, round.id, round.status
            )));
        }
        let round_id = round.id;
        self.round_mut(round_id)?
            .find_match_mut(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    fn advance_phase(&mut self, next: TournamentPhase) -> TournamentResult<()> {
        if next <= self.phase {
            return Err(TournamentError::InvariantViolation(format!(
                "phase cannot move from {} to {}",
                self.phase, next
            )));
        }
        log::info!("Tournament {}: {} -> {}", self.id, self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn require_phase(&self, phase: TournamentPhase, operation: &str) -> TournamentResult<()> {
        if self.phase != phase {
            return Err(TournamentError::InvalidState(format!(
                "cannot {} while tournament {} is in phase {}",
                operation, self.id, self.phase
            )));
        }
        Ok(())
    }

    fn require_running(&self, operation: &str) -> TournamentResult<()> {
        if !matches!(self.phase, TournamentPhase::Swiss | TournamentPhase::TopCut) {
            return Err(TournamentError::InvalidState(format!(
                "cannot {} while tournament {} is in phase {}",
                operation, self.id, self.phase
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::{PreserveOrdering, RandomOrdering};
    use crate::tournament::TournamentSettings;

    fn tournament_with(players: usize, settings: TournamentSettings) -> Tournament {
        let now = Utc::now();
        let mut t = Tournament::new(1, "Test Open".into(), 99, settings, now);
        t.approve().unwrap();
        for i in 0..players {
            let r = t.register(i as i64 + 100, format!("player{i}"), None, now).unwrap();
            t.check_in(r.id, now).unwrap();
        }
        t
    }

    fn play_round(t: &mut Tournament, round_id: RoundId) {
        let now = Utc::now();
        t.start_round(round_id, now).unwrap();
        let ids: Vec<MatchId> = t
            .round(round_id)
            .unwrap()
            .matches
            .iter()
            .filter(|m| !m.is_bye())
            .map(|m| m.id)
            .collect();
        for id in ids {
            t.start_match(id, now).unwrap();
            t.submit_result(id, 2, 0, now).unwrap();
        }
    }

    #[test]
    fn test_band_functions() {
        assert_eq!(swiss_rounds_for(2), 3);
        assert_eq!(swiss_rounds_for(8), 3);
        assert_eq!(swiss_rounds_for(9), 4);
        assert_eq!(swiss_rounds_for(32), 5);
        assert_eq!(swiss_rounds_for(64), 6);
        assert_eq!(swiss_rounds_for(128), 7);
        assert_eq!(swiss_rounds_for(129), 8);

        assert_eq!(auto_top_cut_size(15), None);
        assert_eq!(auto_top_cut_size(16), Some(4));
        assert_eq!(auto_top_cut_size(31), Some(4));
        assert_eq!(auto_top_cut_size(32), Some(8));
    }

    #[test]
    fn test_can_start_requires_approval_and_players() {
        let now = Utc::now();
        let mut t = Tournament::new(1, "Test".into(), 1, Default::default(), now);
        t.register(1, "a".into(), None, now).unwrap();
        t.register(2, "b".into(), None, now).unwrap();
        assert!(!t.can_start());

        t.approve().unwrap();
        assert!(t.can_start());

        let mut single = Tournament::new(2, "Solo".into(), 1, Default::default(), now);
        single.approve().unwrap();
        single.register(1, "a".into(), None, now).unwrap();
        assert!(matches!(
            single.start(&mut PreserveOrdering, now),
            Err(TournamentError::InsufficientPlayers { needed: 2, current: 1 })
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let now = Utc::now();
        let mut t = Tournament::new(1, "Test".into(), 1, Default::default(), now);
        t.register(5, "a".into(), None, now).unwrap();
        assert!(matches!(
            t.register(5, "a".into(), None, now),
            Err(TournamentError::AlreadyRegistered(5))
        ));
    }

    #[test]
    fn test_capacity_and_decklist_policy() {
        let now = Utc::now();
        let settings = TournamentSettings {
            max_participants: Some(2),
            decklist_required: true,
            ..Default::default()
        };
        let mut t = Tournament::new(1, "Test".into(), 1, settings, now);

        assert!(matches!(
            t.register(1, "a".into(), None, now),
            Err(TournamentError::Validation(_))
        ));
        t.register(1, "a".into(), Some("4 Bolt".into()), now).unwrap();
        t.register(2, "b".into(), Some("4 Bolt".into()), now).unwrap();
        assert!(matches!(
            t.register(3, "c".into(), Some("4 Bolt".into()), now),
            Err(TournamentError::TournamentFull(2))
        ));
    }

    #[test]
    fn test_check_in_is_idempotent() {
        let now = Utc::now();
        let mut t = Tournament::new(1, "Test".into(), 1, Default::default(), now);
        let r = t.register(1, "a".into(), None, now).unwrap();

        let first = t.check_in(r.id, now).unwrap();
        let second = t.check_in(r.id, now + chrono::Duration::minutes(5)).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.status, RegistrationStatus::Confirmed);
    }

    #[test]
    fn test_start_sizes_event_and_pairs_round_one() {
        let mut t = tournament_with(5, TournamentSettings::default());
        let outcome = t.start(&mut RandomOrdering::seeded(3), Utc::now()).unwrap();

        assert_eq!(outcome.phase, TournamentPhase::Swiss);
        assert_eq!(outcome.swiss_rounds, 3);
        assert_eq!(outcome.top_cut_size, None);
        assert_eq!(t.current_round, 1);

        let round = t.round(outcome.first_round_id).unwrap();
        assert_eq!(round.matches.len(), 3);
        assert_eq!(round.matches.iter().filter(|m| m.is_bye()).count(), 1);

        let mut seeds: Vec<u32> = t.registrations.iter().filter_map(|r| r.seed_number).collect();
        seeds.sort_unstable();
        assert_eq!(seeds, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_manual_pairing_when_auto_disabled() {
        let settings = TournamentSettings {
            auto_generate_pairings: false,
            ..Default::default()
        };
        let mut t = tournament_with(4, settings);
        let outcome = t.start(&mut PreserveOrdering, Utc::now()).unwrap();
        assert!(t.round(outcome.first_round_id).unwrap().matches.is_empty());

        let matches = t
            .generate_pairings(outcome.first_round_id, &mut PreserveOrdering, Utc::now())
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].table_number, Some(1));
        assert_eq!(matches[1].table_number, Some(2));

        assert!(matches!(
            t.generate_pairings(outcome.first_round_id, &mut PreserveOrdering, Utc::now()),
            Err(TournamentError::InvalidState(_))
        ));
    }

    #[test]
    fn test_match_actions_require_active_round() {
        let mut t = tournament_with(4, TournamentSettings::default());
        let outcome = t.start(&mut PreserveOrdering, Utc::now()).unwrap();
        let match_id = t.round(outcome.first_round_id).unwrap().matches[0].id;

        assert!(matches!(
            t.start_match(match_id, Utc::now()),
            Err(TournamentError::InvalidState(_))
        ));
    }

    #[test]
    fn test_finish_round_gate_leaves_state_untouched() {
        let mut t = tournament_with(4, TournamentSettings::default());
        let outcome = t.start(&mut PreserveOrdering, Utc::now()).unwrap();
        t.start_round(outcome.first_round_id, Utc::now()).unwrap();

        let before = t.clone();
        assert!(matches!(
            t.finish_round(outcome.first_round_id, &mut PreserveOrdering, Utc::now()),
            Err(TournamentError::InvalidState(_))
        ));
        assert_eq!(t, before);
    }

    #[test]
    fn test_swiss_only_event_finishes_after_last_round() {
        let settings = TournamentSettings {
            swiss_rounds: Some(2),
            top_cut: TopCutPolicy::Disabled,
            ..Default::default()
        };
        let mut t = tournament_with(4, settings);
        let first = t.start(&mut PreserveOrdering, Utc::now()).unwrap().first_round_id;

        play_round(&mut t, first);
        let advance = t.finish_round(first, &mut PreserveOrdering, Utc::now()).unwrap();
        let NextStep::NextSwissRound { round_id, number } = advance.next else {
            panic!("expected a second Swiss round, got {:?}", advance.next);
        };
        assert_eq!(number, 2);
        assert_eq!(t.current_round, 2);

        play_round(&mut t, round_id);
        let advance = t.finish_round(round_id, &mut PreserveOrdering, Utc::now()).unwrap();
        assert_eq!(advance.next, NextStep::TournamentFinished);
        assert_eq!(t.phase, TournamentPhase::Finished);
        assert!(t.registrations.iter().all(|r| r.final_ranking.is_some()));
        assert_eq!(advance.standings[0].match_points, 6);
    }

    #[test]
    fn test_phase_never_regresses() {
        let mut t = tournament_with(2, TournamentSettings::default());
        t.start(&mut PreserveOrdering, Utc::now()).unwrap();
        assert!(t.advance_phase(TournamentPhase::Registration).is_err());
        assert!(t.approve().is_err());
    }

    #[test]
    fn test_pause_is_advisory() {
        let mut t = tournament_with(2, TournamentSettings::default());
        let first = t.start(&mut PreserveOrdering, Utc::now()).unwrap().first_round_id;

        assert!(t.pause(Some("judge call".into()), Utc::now()).unwrap());
        assert!(!t.pause(None, Utc::now()).unwrap());
        assert!(t.is_paused());

        play_round(&mut t, first);
        assert!(t.resume().unwrap());
        assert!(!t.is_paused());
    }

    #[test]
    fn test_overtime_rounds() {
        let mut t = tournament_with(2, TournamentSettings::default());
        let first = t.start(&mut PreserveOrdering, Utc::now()).unwrap().first_round_id;
        let started = Utc::now();
        t.start_round(first, started).unwrap();

        assert!(t.overtime_rounds(started).is_empty());
        assert_eq!(
            t.overtime_rounds(started + chrono::Duration::minutes(51)),
            vec![first]
        );
    }

    #[test]
    fn test_disqualified_player_drops_out_of_pairings() {
        let settings = TournamentSettings {
            top_cut: TopCutPolicy::Disabled,
            ..Default::default()
        };
        let mut t = tournament_with(4, settings);
        let first = t.start(&mut PreserveOrdering, Utc::now()).unwrap().first_round_id;
        t.start_round(first, Utc::now()).unwrap();

        let m = t.round(first).unwrap().matches[0].clone();
        let outcome = t
            .disqualify_player(m.id, m.player1, "marked cards", Utc::now())
            .unwrap();
        assert_eq!(outcome.awarded_to, m.player2.unwrap());
        assert_eq!(
            t.registration(m.player1).unwrap().status,
            RegistrationStatus::Disqualified
        );

        let other = t.round(first).unwrap().matches[1].id;
        t.start_match(other, Utc::now()).unwrap();
        t.submit_result(other, 2, 1, Utc::now()).unwrap();

        let advance = t.finish_round(first, &mut PreserveOrdering, Utc::now()).unwrap();
        assert_eq!(advance.standings.len(), 3);
        let NextStep::NextSwissRound { round_id, .. } = advance.next else {
            panic!("expected another Swiss round");
        };
        let next = t.round(round_id).unwrap();
        assert!(next.matches.iter().all(|x| !x.involves(m.player1)));
        assert_eq!(next.matches.iter().filter(|x| x.is_bye()).count(), 1);
    }
}
