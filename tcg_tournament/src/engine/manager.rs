//! Tournament manager: spawns actors and routes commands to them.

use super::{
    actor::{TournamentActor, TournamentHandle},
    config::EngineConfig,
    messages::{Rejection, TournamentMessage, TournamentReply},
};
use crate::{
    collaborators::{Authorizer, NotificationSink},
    db::TournamentRepository,
    matches::{Match, MatchId},
    pairing::{OrderingStrategy, RandomOrdering},
    registration::{Registration, RegistrationId},
    round::{Round, RoundId},
    standings::StandingEntry,
    tournament::{
        CorrectionOutcome, DisqualificationOutcome, Event, EventDetails, RoundAdvance,
        StartOutcome, Tournament, TournamentError, TournamentId, TournamentPhase,
        TournamentSnapshot,
    },
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Where a tournament lives right now
enum Lookup {
    Live(TournamentHandle),
    Finished(Box<Tournament>),
}

/// Tournament manager for managing every running tournament
pub struct TournamentManager {
    repository: Arc<dyn TournamentRepository>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn NotificationSink>,
    config: EngineConfig,

    /// Live actor handles
    tournaments: Arc<RwLock<HashMap<TournamentId, TournamentHandle>>>,
}

impl TournamentManager {
    pub fn new(
        repository: Arc<dyn TournamentRepository>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            authorizer,
            notifier,
            config,
            tournaments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawn actors for every stored tournament that is not finished
    ///
    /// # Returns
    ///
    /// * `Result<usize, TournamentError>` - Number of tournaments loaded
    pub async fn load_existing_tournaments(&self) -> Result<usize, TournamentError> {
        let stored = self.repository.list().await?;
        let mut loaded = 0;

        for tournament in stored
            .into_iter()
            .filter(|t| t.phase != TournamentPhase::Finished)
        {
            log::info!("Loaded tournament {} '{}'", tournament.id, tournament.name);
            self.spawn(tournament).await;
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Create a tournament from a tournament event
    ///
    /// The acting user must be allowed to manage tournaments of the event's
    /// organizer.
    pub async fn create_tournament(
        &self,
        actor_id: i64,
        mut event: Event,
    ) -> TournamentReply<TournamentSnapshot> {
        if !self.authorizer.can_manage(actor_id, event.organizer_id).await {
            return Err(TournamentError::Unauthorized {
                actor_id,
                tournament_id: 0,
            }
            .into());
        }

        if let EventDetails::Tournament(settings) = &mut event.details {
            settings
                .match_time_limit_minutes
                .get_or_insert(self.config.default_match_time_limit_minutes);
        }

        let id = self.repository.next_id().await.map_err(TournamentError::from)?;
        let tournament = event.into_tournament(id, Utc::now())?;
        self.repository
            .insert(&tournament)
            .await
            .map_err(TournamentError::from)?;

        let snapshot = tournament.snapshot();
        log::info!(
            "Created tournament {} '{}' for organizer {}",
            id,
            tournament.name,
            tournament.organizer_id
        );
        self.spawn(tournament).await;

        Ok(snapshot)
    }

    /// Summaries of all stored tournaments
    pub async fn list_tournaments(&self) -> Result<Vec<TournamentSnapshot>, TournamentError> {
        let stored = self.repository.list().await?;
        Ok(stored.iter().map(Tournament::snapshot).collect())
    }

    /// Get a tournament handle, loading the tournament if no actor runs it
    ///
    /// Finished tournaments get no actor; commands against them are refused
    /// with the final state attached.
    pub async fn get_tournament(&self, id: TournamentId) -> Result<TournamentHandle, Rejection> {
        match self.lookup(id).await? {
            Lookup::Live(handle) => Ok(handle),
            Lookup::Finished(tournament) => Err(Rejection::new(
                TournamentError::InvalidState(format!("tournament {id} is finished")),
                Some(tournament.snapshot()),
            )),
        }
    }

    /// Number of running actors
    pub async fn active_tournament_count(&self) -> usize {
        let tournaments = self.tournaments.read().await;
        tournaments.values().filter(|h| !h.is_closed()).count()
    }

    async fn live_handle(&self, id: TournamentId) -> Option<TournamentHandle> {
        let tournaments = self.tournaments.read().await;
        tournaments.get(&id).filter(|h| !h.is_closed()).cloned()
    }

    async fn lookup(&self, id: TournamentId) -> Result<Lookup, Rejection> {
        if let Some(handle) = self.live_handle(id).await {
            return Ok(Lookup::Live(handle));
        }

        let tournament = self.repository.load(id).await.map_err(TournamentError::from)?;
        if tournament.phase == TournamentPhase::Finished {
            self.retire(id).await;
            return Ok(Lookup::Finished(Box::new(tournament)));
        }
        Ok(Lookup::Live(self.spawn(tournament).await))
    }

    /// Drop the handle of a tournament whose actor has stopped or is stopping
    async fn retire(&self, id: TournamentId) {
        if self.tournaments.write().await.remove(&id).is_some() {
            log::info!("Tournament {} retired from the manager", id);
        }
    }

    async fn spawn(&self, tournament: Tournament) -> TournamentHandle {
        let mut tournaments = self.tournaments.write().await;
        if let Some(handle) = tournaments.get(&tournament.id)
            && !handle.is_closed()
        {
            return handle.clone();
        }
        tournaments.retain(|_, h| !h.is_closed());

        let ordering = self.ordering(tournament.id);
        let (actor, handle) = TournamentActor::new(
            tournament,
            self.repository.clone(),
            self.notifier.clone(),
            ordering,
            &self.config,
        );
        tournaments.insert(handle.tournament_id(), handle.clone());
        drop(tournaments);

        tokio::spawn(async move {
            actor.run().await;
        });

        handle
    }

    /// Round-one shuffle source; a configured seed is mixed with the tournament ID
    fn ordering(&self, id: TournamentId) -> Box<dyn OrderingStrategy> {
        match self.config.ordering_seed {
            Some(seed) => Box::new(RandomOrdering::seeded(seed ^ id as u64)),
            None => Box::new(RandomOrdering::new()),
        }
    }

    /// Handle of a tournament the actor may manage
    async fn managed(&self, actor_id: i64, id: TournamentId) -> Result<TournamentHandle, Rejection> {
        let handle = self.get_tournament(id).await?;
        if self.authorizer.can_manage(actor_id, handle.organizer_id()).await {
            return Ok(handle);
        }

        log::warn!("User {} denied management of tournament {}", actor_id, id);
        Err(TournamentError::Unauthorized {
            actor_id,
            tournament_id: id,
        }
        .into())
    }

    pub async fn snapshot(&self, id: TournamentId) -> TournamentReply<TournamentSnapshot> {
        match self.lookup(id).await? {
            Lookup::Live(handle) => {
                handle
                    .query(|response| TournamentMessage::GetSnapshot { response })
                    .await
            }
            Lookup::Finished(tournament) => Ok(tournament.snapshot()),
        }
    }

    pub async fn tournament(&self, id: TournamentId) -> TournamentReply<Tournament> {
        match self.lookup(id).await? {
            Lookup::Live(handle) => {
                handle
                    .query(|response| TournamentMessage::GetTournament { response })
                    .await
            }
            Lookup::Finished(tournament) => Ok(*tournament),
        }
    }

    /// Ranked standings (GetStandings)
    pub async fn standings(&self, id: TournamentId) -> TournamentReply<Vec<StandingEntry>> {
        match self.lookup(id).await? {
            Lookup::Live(handle) => {
                handle
                    .query(|response| TournamentMessage::GetStandings { response })
                    .await
            }
            Lookup::Finished(tournament) => Ok(tournament.standings()),
        }
    }

    pub async fn approve(
        &self,
        actor_id: i64,
        id: TournamentId,
    ) -> TournamentReply<TournamentSnapshot> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::Approve { response })
            .await
    }

    /// Register the acting user
    pub async fn register(
        &self,
        id: TournamentId,
        user_id: i64,
        username: String,
        decklist: Option<String>,
    ) -> TournamentReply<Registration> {
        self.get_tournament(id)
            .await?
            .request(|response| TournamentMessage::Register {
                user_id,
                username,
                decklist,
                response,
            })
            .await
    }

    pub async fn check_in(
        &self,
        actor_id: i64,
        id: TournamentId,
        registration_id: RegistrationId,
    ) -> TournamentReply<Registration> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::CheckIn {
                registration_id,
                response,
            })
            .await
    }

    pub async fn cancel_registration(
        &self,
        actor_id: i64,
        id: TournamentId,
        registration_id: RegistrationId,
    ) -> TournamentReply<Registration> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::CancelRegistration {
                registration_id,
                response,
            })
            .await
    }

    pub async fn mark_no_show(
        &self,
        actor_id: i64,
        id: TournamentId,
        registration_id: RegistrationId,
    ) -> TournamentReply<Registration> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::MarkNoShow {
                registration_id,
                response,
            })
            .await
    }

    /// StartTournament
    pub async fn start(&self, actor_id: i64, id: TournamentId) -> TournamentReply<StartOutcome> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::Start { response })
            .await
    }

    /// GeneratePairings
    pub async fn generate_pairings(
        &self,
        actor_id: i64,
        id: TournamentId,
        round_id: RoundId,
    ) -> TournamentReply<Vec<Match>> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::GeneratePairings { round_id, response })
            .await
    }

    /// StartRound
    pub async fn start_round(
        &self,
        actor_id: i64,
        id: TournamentId,
        round_id: RoundId,
    ) -> TournamentReply<Round> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::StartRound { round_id, response })
            .await
    }

    /// StartMatch
    pub async fn start_match(
        &self,
        actor_id: i64,
        id: TournamentId,
        match_id: MatchId,
    ) -> TournamentReply<Match> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::StartMatch { match_id, response })
            .await
    }

    /// SubmitMatchResult
    pub async fn submit_result(
        &self,
        actor_id: i64,
        id: TournamentId,
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
    ) -> TournamentReply<Match> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::SubmitResult {
                match_id,
                player1_score,
                player2_score,
                response,
            })
            .await
    }

    /// CorrectMatchResult
    pub async fn correct_result(
        &self,
        actor_id: i64,
        id: TournamentId,
        match_id: MatchId,
        player1_score: i64,
        player2_score: i64,
        note: String,
    ) -> TournamentReply<CorrectionOutcome> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::CorrectResult {
                match_id,
                player1_score,
                player2_score,
                note,
                response,
            })
            .await
    }

    /// DisqualifyPlayer
    pub async fn disqualify_player(
        &self,
        actor_id: i64,
        id: TournamentId,
        match_id: MatchId,
        registration_id: RegistrationId,
        reason: String,
    ) -> TournamentReply<DisqualificationOutcome> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::DisqualifyPlayer {
                match_id,
                registration_id,
                reason,
                response,
            })
            .await
    }

    /// FinishRound
    pub async fn finish_round(
        &self,
        actor_id: i64,
        id: TournamentId,
        round_id: RoundId,
    ) -> TournamentReply<RoundAdvance> {
        let advance = self
            .managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::FinishRound { round_id, response })
            .await;
        self.retire_if_finished(id, &advance).await;
        advance
    }

    /// ForceFinishRound
    pub async fn force_finish_round(
        &self,
        actor_id: i64,
        id: TournamentId,
        round_id: RoundId,
        reason: String,
    ) -> TournamentReply<RoundAdvance> {
        let advance = self
            .managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::ForceFinishRound {
                round_id,
                reason,
                response,
            })
            .await;
        self.retire_if_finished(id, &advance).await;
        advance
    }

    async fn retire_if_finished(&self, id: TournamentId, advance: &TournamentReply<RoundAdvance>) {
        if matches!(advance, Ok(a) if a.phase == TournamentPhase::Finished) {
            self.retire(id).await;
        }
    }

    pub async fn finish(
        &self,
        actor_id: i64,
        id: TournamentId,
    ) -> TournamentReply<Vec<StandingEntry>> {
        let standings = self
            .managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::Finish { response })
            .await?;
        self.retire(id).await;
        Ok(standings)
    }

    pub async fn pause(
        &self,
        actor_id: i64,
        id: TournamentId,
        reason: Option<String>,
    ) -> TournamentReply<bool> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::Pause { reason, response })
            .await
    }

    pub async fn resume(&self, actor_id: i64, id: TournamentId) -> TournamentReply<bool> {
        self.managed(actor_id, id)
            .await?
            .request(|response| TournamentMessage::Resume { response })
            .await
    }

    /// Ask every actor to run its overtime check now
    pub async fn check_overtime(&self) {
        let tournaments = self.tournaments.read().await;
        for handle in tournaments.values() {
            let _ = handle.send(TournamentMessage::Tick).await;
        }
    }

    /// Stop every actor
    pub async fn shutdown(&self) {
        let mut tournaments = self.tournaments.write().await;
        for (id, handle) in tournaments.drain() {
            if handle.send(TournamentMessage::Shutdown).await.is_err() {
                log::debug!("Tournament {} actor already stopped", id);
            }
        }
    }
}
