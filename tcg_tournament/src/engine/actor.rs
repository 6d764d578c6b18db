//! Tournament actor: the single writer of one tournament.

use super::{
    config::EngineConfig,
    messages::{Rejection, TournamentMessage, TournamentReply},
};
use crate::{
    collaborators::{NotificationSink, TournamentEvent},
    db::TournamentRepository,
    pairing::OrderingStrategy,
    round::RoundId,
    tournament::{
        NextStep, RoundAdvance, Tournament, TournamentError, TournamentId, TournamentPhase,
        TournamentResult,
    },
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, MissedTickBehavior, interval},
};

/// Tournament actor handle for sending messages
#[derive(Debug, Clone)]
pub struct TournamentHandle {
    sender: mpsc::Sender<TournamentMessage>,
    tournament_id: TournamentId,
    organizer_id: i64,
}

impl TournamentHandle {
    pub fn new(
        sender: mpsc::Sender<TournamentMessage>,
        tournament_id: TournamentId,
        organizer_id: i64,
    ) -> Self {
        Self {
            sender,
            tournament_id,
            organizer_id,
        }
    }

    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub fn organizer_id(&self) -> i64 {
        self.organizer_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the tournament
    pub async fn send(&self, message: TournamentMessage) -> Result<(), Rejection> {
        self.sender
            .send(message)
            .await
            .map_err(|_| Rejection::unavailable(self.tournament_id))
    }

    /// Send a command and wait for its reply
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<TournamentReply<T>>) -> TournamentMessage,
    ) -> TournamentReply<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| Rejection::unavailable(self.tournament_id))?
    }

    /// Send a query and wait for its answer
    pub async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TournamentMessage,
    ) -> TournamentReply<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| Rejection::unavailable(self.tournament_id))
    }
}

/// Tournament actor owning one tournament aggregate.
///
/// Each command runs against a clone of the aggregate; the clone is saved
/// with the version it started from and only then replaces the live state.
/// A failed command or a failed save leaves the live state untouched.
pub struct TournamentActor {
    tournament: Tournament,
    inbox: mpsc::Receiver<TournamentMessage>,
    repository: Arc<dyn TournamentRepository>,
    notifier: Arc<dyn NotificationSink>,
    ordering: Box<dyn OrderingStrategy>,
    overtime_check: Duration,
    /// Rounds already reported as over time
    overtime_alerted: HashSet<RoundId>,
    is_closed: bool,
}

impl TournamentActor {
    /// Create a new tournament actor and the handle to reach it
    pub fn new(
        tournament: Tournament,
        repository: Arc<dyn TournamentRepository>,
        notifier: Arc<dyn NotificationSink>,
        ordering: Box<dyn OrderingStrategy>,
        config: &EngineConfig,
    ) -> (Self, TournamentHandle) {
        let (sender, inbox) = mpsc::channel(config.channel_capacity);
        let handle = TournamentHandle::new(sender, tournament.id, tournament.organizer_id);

        let actor = Self {
            tournament,
            inbox,
            repository,
            notifier,
            ordering,
            overtime_check: Duration::from_secs(config.overtime_check_interval_secs),
            overtime_alerted: HashSet::new(),
            is_closed: false,
        };

        (actor, handle)
    }

    /// Run the actor event loop until shutdown, until the tournament finishes,
    /// or until every handle is dropped
    pub async fn run(mut self) {
        log::info!(
            "Tournament {} '{}' actor starting",
            self.tournament.id,
            self.tournament.name
        );

        let mut overtime_interval = interval(self.overtime_check);
        overtime_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }

                    if self.tournament.phase == TournamentPhase::Finished && !self.is_closed {
                        log::info!(
                            "Tournament {} finished, retiring its actor",
                            self.tournament.id
                        );
                        self.is_closed = true;
                    }

                    if self.is_closed {
                        break;
                    }
                }

                _ = overtime_interval.tick() => {
                    self.check_overtime();
                }
            }
        }

        log::info!("Tournament {} actor stopped", self.tournament.id);
    }

    async fn handle_message(&mut self, message: TournamentMessage) {
        match message {
            TournamentMessage::GetSnapshot { response } => {
                let _ = response.send(self.tournament.snapshot());
            }

            TournamentMessage::GetTournament { response } => {
                let _ = response.send(self.tournament.clone());
            }

            TournamentMessage::GetStandings { response } => {
                let _ = response.send(self.tournament.standings());
            }

            TournamentMessage::Approve { response } => {
                let result = self
                    .commit(|t, _| {
                        t.approve()?;
                        Ok(t.snapshot())
                    })
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::Register {
                user_id,
                username,
                decklist,
                response,
            } => {
                let result = self
                    .commit(|t, _| t.register(user_id, username, decklist, Utc::now()))
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::CheckIn {
                registration_id,
                response,
            } => {
                let result = self
                    .commit(|t, _| t.check_in(registration_id, Utc::now()))
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::CancelRegistration {
                registration_id,
                response,
            } => {
                let result = self
                    .commit(|t, _| t.cancel_registration(registration_id))
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::MarkNoShow {
                registration_id,
                response,
            } => {
                let result = self.commit(|t, _| t.mark_no_show(registration_id)).await;
                let _ = response.send(result);
            }

            TournamentMessage::Start { response } => {
                let result = self
                    .commit(|t, ordering| t.start(ordering, Utc::now()))
                    .await;
                if let Ok(outcome) = &result {
                    self.notify(TournamentEvent::TournamentStarted {
                        tournament_id: self.tournament.id,
                        swiss_rounds: outcome.swiss_rounds,
                        top_cut_size: outcome.top_cut_size,
                    });
                    self.notify_pairings(outcome.first_round_id);
                }
                let _ = response.send(result);
            }

            TournamentMessage::GeneratePairings { round_id, response } => {
                let result = self
                    .commit(|t, ordering| t.generate_pairings(round_id, ordering, Utc::now()))
                    .await;
                if result.is_ok() {
                    self.notify_pairings(round_id);
                }
                let _ = response.send(result);
            }

            TournamentMessage::StartRound { round_id, response } => {
                let result = self.commit(|t, _| t.start_round(round_id, Utc::now())).await;
                if let Ok(round) = &result {
                    self.notify(TournamentEvent::RoundStarted {
                        tournament_id: self.tournament.id,
                        round_id: round.id,
                        round_type: round.round_type,
                        number: round.number,
                    });
                }
                let _ = response.send(result);
            }

            TournamentMessage::StartMatch { match_id, response } => {
                let result = self.commit(|t, _| t.start_match(match_id, Utc::now())).await;
                let _ = response.send(result);
            }

            TournamentMessage::SubmitResult {
                match_id,
                player1_score,
                player2_score,
                response,
            } => {
                let result = self
                    .commit(|t, _| {
                        t.submit_result(match_id, player1_score, player2_score, Utc::now())
                    })
                    .await;
                if let Ok(m) = &result {
                    self.notify(TournamentEvent::MatchFinished {
                        tournament_id: self.tournament.id,
                        match_id: m.id,
                        winner: m.winner,
                    });
                }
                let _ = response.send(result);
            }

            TournamentMessage::CorrectResult {
                match_id,
                player1_score,
                player2_score,
                note,
                response,
            } => {
                let result = self
                    .commit(|t, _| t.correct_result(match_id, player1_score, player2_score, &note))
                    .await;
                let _ = response.send(result);
            }

            TournamentMessage::DisqualifyPlayer {
                match_id,
                registration_id,
                reason,
                response,
            } => {
                let result = self
                    .commit(|t, _| {
                        t.disqualify_player(match_id, registration_id, &reason, Utc::now())
                    })
                    .await;
                if result.is_ok() {
                    self.notify(TournamentEvent::PlayerDisqualified {
                        tournament_id: self.tournament.id,
                        registration_id,
                        reason,
                    });
                }
                let _ = response.send(result);
            }

            TournamentMessage::FinishRound { round_id, response } => {
                let result = self
                    .commit(|t, ordering| t.finish_round(round_id, ordering, Utc::now()))
                    .await;
                if let Ok(advance) = &result {
                    self.notify_advance(advance);
                }
                let _ = response.send(result);
            }

            TournamentMessage::ForceFinishRound {
                round_id,
                reason,
                response,
            } => {
                let result = self
                    .commit(|t, ordering| {
                        t.force_finish_round(round_id, &reason, ordering, Utc::now())
                    })
                    .await;
                if let Ok(advance) = &result {
                    self.notify_advance(advance);
                }
                let _ = response.send(result);
            }

            TournamentMessage::Finish { response } => {
                let result = self.commit(|t, _| t.finish(Utc::now())).await;
                if let Ok(standings) = &result {
                    self.notify(TournamentEvent::TournamentFinished {
                        tournament_id: self.tournament.id,
                        winner: standings.first().map(|s| s.registration_id),
                    });
                }
                let _ = response.send(result);
            }

            TournamentMessage::Pause { reason, response } => {
                let result = self.commit(|t, _| t.pause(reason, Utc::now())).await;
                let _ = response.send(result);
            }

            TournamentMessage::Resume { response } => {
                let result = self.commit(|t, _| t.resume()).await;
                let _ = response.send(result);
            }

            TournamentMessage::Tick => {
                self.check_overtime();
            }

            TournamentMessage::Shutdown => {
                self.is_closed = true;
            }
        }
    }

    /// Apply `operation` to a copy, persist it, then make it current
    async fn commit<T>(
        &mut self,
        operation: impl FnOnce(&mut Tournament, &mut dyn OrderingStrategy) -> TournamentResult<T>,
    ) -> TournamentReply<T> {
        let mut draft = self.tournament.clone();
        let value = match operation(&mut draft, self.ordering.as_mut()) {
            Ok(value) => value,
            Err(error) => return Err(self.reject(error)),
        };

        let expected = self.tournament.version;
        draft.version = expected + 1;
        if let Err(error) = self.repository.save(&draft, expected).await {
            let error = TournamentError::from(error);
            if matches!(error, TournamentError::Conflict(_)) {
                self.reload().await;
            }
            return Err(self.reject(error));
        }

        self.tournament = draft;
        Ok(value)
    }

    /// Replace the live state with the stored one after losing a write race
    async fn reload(&mut self) {
        match self.repository.load(self.tournament.id).await {
            Ok(stored) => {
                log::warn!(
                    "Tournament {}: reloaded version {} after a concurrent write",
                    stored.id,
                    stored.version
                );
                self.tournament = stored;
            }
            Err(e) => log::error!("Tournament {}: reload failed: {}", self.tournament.id, e),
        }
    }

    fn reject(&self, error: TournamentError) -> Rejection {
        match &error {
            TournamentError::InvariantViolation(_) | TournamentError::Repository(_) => {
                log::error!("Tournament {}: {}", self.tournament.id, error);
            }
            _ => log::debug!("Tournament {}: rejected: {}", self.tournament.id, error),
        }
        Rejection::new(error, Some(self.tournament.snapshot()))
    }

    fn check_overtime(&mut self) {
        for round_id in self.tournament.overtime_rounds(Utc::now()) {
            if !self.overtime_alerted.insert(round_id) {
                continue;
            }
            let unfinished_matches = self
                .tournament
                .round(round_id)
                .map(|r| r.unfinished_matches())
                .unwrap_or(0);
            log::warn!(
                "Tournament {}: round {} is over time with {} unfinished match(es)",
                self.tournament.id,
                round_id,
                unfinished_matches
            );
            self.notify(TournamentEvent::RoundOvertime {
                tournament_id: self.tournament.id,
                round_id,
                unfinished_matches,
            });
        }
    }

    fn notify_pairings(&self, round_id: RoundId) {
        if let Ok(round) = self.tournament.round(round_id)
            && round.pairings_generated
        {
            self.notify(TournamentEvent::PairingsPublished {
                tournament_id: self.tournament.id,
                round_id,
                matches: round.matches.len(),
            });
        }
    }

    fn notify_advance(&self, advance: &RoundAdvance) {
        self.notify(TournamentEvent::RoundFinished {
            tournament_id: self.tournament.id,
            round_id: advance.round_id,
            forced_matches: advance.forced_matches,
        });

        match advance.next {
            NextStep::NextSwissRound { round_id, .. }
            | NextStep::TopCutStarted { round_id, .. }
            | NextStep::NextTopCutRound { round_id, .. } => self.notify_pairings(round_id),
            NextStep::TournamentFinished => {
                self.notify(TournamentEvent::TournamentFinished {
                    tournament_id: self.tournament.id,
                    winner: self.tournament.standings().first().map(|s| s.registration_id),
                });
            }
        }
    }

    fn notify(&self, event: TournamentEvent) {
        self.notifier.notify(event);
    }
}
