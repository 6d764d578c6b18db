//! Integration tests for the tournament engine
//!
//! These tests run commands through the manager and its actors against the
//! in-memory repository, plus one PostgreSQL round trip that needs
//! `DATABASE_URL` and is ignored by default.

use serial_test::serial;
use std::sync::Arc;
use tcg_tournament::collaborators::{ChannelNotifier, LogNotifier, OrganizerOrAdmin, TournamentEvent};
use tcg_tournament::db::{InMemoryTournamentRepository, TournamentRepository};
use tcg_tournament::engine::{EngineConfig, TournamentManager};
use tcg_tournament::tournament::NextStep;
use tcg_tournament::{
    Event, EventDetails, TopCutPolicy, TournamentId, TournamentPhase, TournamentSettings,
};

const ORGANIZER: i64 = 42;
const ADMIN: i64 = 1;

fn event(settings: TournamentSettings) -> Event {
    Event {
        name: "Store Championship".to_string(),
        description: Some("Standard format".to_string()),
        organizer_id: ORGANIZER,
        starts_at: None,
        location: Some("Back room".to_string()),
        details: EventDetails::Tournament(settings),
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        ordering_seed: Some(99),
        ..Default::default()
    }
}

fn manager_with(repository: Arc<InMemoryTournamentRepository>) -> TournamentManager {
    TournamentManager::new(
        repository,
        Arc::new(OrganizerOrAdmin::new([ADMIN])),
        Arc::new(LogNotifier),
        config(),
    )
}

/// Create, approve and fill a tournament with `players` checked-in players
async fn ready_tournament(
    manager: &TournamentManager,
    players: i64,
    settings: TournamentSettings,
) -> TournamentId {
    let id = manager.create_tournament(ORGANIZER, event(settings)).await.unwrap().id;
    manager.approve(ORGANIZER, id).await.unwrap();
    for user_id in 100..100 + players {
        let registration = manager
            .register(id, user_id, format!("user{user_id}"), None)
            .await
            .unwrap();
        manager.check_in(ORGANIZER, id, registration.id).await.unwrap();
    }
    id
}

#[tokio::test]
async fn test_full_swiss_event_through_the_manager() {
    let repository = Arc::new(InMemoryTournamentRepository::new());
    let manager = manager_with(repository.clone());
    let settings = TournamentSettings {
        swiss_rounds: Some(2),
        top_cut: TopCutPolicy::Disabled,
        ..Default::default()
    };
    let id = ready_tournament(&manager, 4, settings).await;

    let started = manager.start(ORGANIZER, id).await.unwrap();
    assert_eq!(started.phase, TournamentPhase::Swiss);
    let mut round_id = started.first_round_id;

    for number in 1..=2 {
        let round = manager.start_round(ORGANIZER, id, round_id).await.unwrap();
        assert_eq!(round.number, number);
        for m in round.matches.iter().filter(|m| !m.is_bye()) {
            manager.start_match(ORGANIZER, id, m.id).await.unwrap();
            manager.submit_result(ORGANIZER, id, m.id, 2, 1).await.unwrap();
        }

        let advance = manager.finish_round(ORGANIZER, id, round_id).await.unwrap();
        match advance.next {
            NextStep::NextSwissRound { round_id: next, .. } => round_id = next,
            NextStep::TournamentFinished => assert_eq!(number, 2),
            other => panic!("unexpected step {other:?}"),
        }
    }

    let snapshot = manager.snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, TournamentPhase::Finished);

    let standings = manager.standings(id).await.unwrap();
    assert_eq!(standings.len(), 4);
    assert_eq!(standings[0].match_points, 6);

    // Every accepted command was persisted
    let stored = repository.load(id).await.unwrap();
    assert_eq!(stored.version, snapshot.version);
    assert_eq!(stored.phase, TournamentPhase::Finished);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_finished_tournament_releases_its_actor() {
    let repository = Arc::new(InMemoryTournamentRepository::new());
    let manager = manager_with(repository.clone());
    let settings = TournamentSettings {
        swiss_rounds: Some(1),
        top_cut: TopCutPolicy::Disabled,
        ..Default::default()
    };
    let id = ready_tournament(&manager, 2, settings).await;
    let round_id = manager.start(ORGANIZER, id).await.unwrap().first_round_id;
    assert_eq!(manager.active_tournament_count().await, 1);

    let round = manager.start_round(ORGANIZER, id, round_id).await.unwrap();
    let match_id = round.matches[0].id;
    manager.start_match(ORGANIZER, id, match_id).await.unwrap();
    manager.submit_result(ORGANIZER, id, match_id, 2, 0).await.unwrap();
    let advance = manager.finish_round(ORGANIZER, id, round_id).await.unwrap();
    assert_eq!(advance.next, NextStep::TournamentFinished);
    assert_eq!(manager.active_tournament_count().await, 0);

    // Reads are served from storage without bringing an actor back
    let snapshot = manager.snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, TournamentPhase::Finished);
    assert_eq!(manager.standings(id).await.unwrap().len(), 2);
    assert_eq!(manager.tournament(id).await.unwrap().phase, TournamentPhase::Finished);
    assert_eq!(manager.active_tournament_count().await, 0);

    let rejection = manager.pause(ORGANIZER, id, None).await.unwrap_err();
    assert_eq!(rejection.error.kind(), "invalid_state");
    assert_eq!(rejection.state.unwrap().phase, TournamentPhase::Finished);
    assert_eq!(manager.active_tournament_count().await, 0);

    // A fresh manager does not reload it either
    let restarted = manager_with(repository);
    assert_eq!(restarted.load_existing_tournaments().await.unwrap(), 0);
    assert_eq!(restarted.snapshot(id).await.unwrap().phase, TournamentPhase::Finished);
    assert_eq!(restarted.active_tournament_count().await, 0);
}

#[tokio::test]
async fn test_early_finish_retires_the_actor() {
    let manager = manager_with(Arc::new(InMemoryTournamentRepository::new()));
    let id = ready_tournament(&manager, 4, TournamentSettings::default()).await;
    manager.start(ORGANIZER, id).await.unwrap();

    let standings = manager.finish(ORGANIZER, id).await.unwrap();
    assert_eq!(standings.len(), 4);
    assert_eq!(manager.active_tournament_count().await, 0);

    let rejection = manager.finish(ORGANIZER, id).await.unwrap_err();
    assert_eq!(rejection.error.kind(), "invalid_state");
}

#[tokio::test]
async fn test_top_cut_draw_rejected_through_the_manager() {
    let manager = manager_with(Arc::new(InMemoryTournamentRepository::new()));
    let settings = TournamentSettings {
        swiss_rounds: Some(1),
        top_cut: TopCutPolicy::Fixed { size: 2 },
        ..Default::default()
    };
    let id = ready_tournament(&manager, 4, settings).await;
    let round_id = manager.start(ORGANIZER, id).await.unwrap().first_round_id;
    let round = manager.start_round(ORGANIZER, id, round_id).await.unwrap();
    for m in &round.matches {
        manager.start_match(ORGANIZER, id, m.id).await.unwrap();
        manager.submit_result(ORGANIZER, id, m.id, 2, 0).await.unwrap();
    }
    let advance = manager.finish_round(ORGANIZER, id, round_id).await.unwrap();
    let NextStep::TopCutStarted { round_id: final_id, size } = advance.next else {
        panic!("expected the top cut, got {:?}", advance.next);
    };
    assert_eq!(size, 2);

    let final_round = manager.start_round(ORGANIZER, id, final_id).await.unwrap();
    let final_match = final_round.matches[0].id;
    manager.start_match(ORGANIZER, id, final_match).await.unwrap();

    let rejection = manager
        .submit_result(ORGANIZER, id, final_match, 1, 1)
        .await
        .unwrap_err();
    assert_eq!(rejection.error.kind(), "validation");
    let state = rejection.state.unwrap();
    assert_eq!(state.phase, TournamentPhase::TopCut);
    assert_eq!(state.current_round, 2);
    assert_eq!(state.top_cut_round, Some(1));

    let rejection = manager
        .force_finish_round(ORGANIZER, id, final_id, "out of time".to_string())
        .await
        .unwrap_err();
    assert_eq!(rejection.error.kind(), "invalid_state");

    manager.submit_result(ORGANIZER, id, final_match, 2, 1).await.unwrap();
    let advance = manager.finish_round(ORGANIZER, id, final_id).await.unwrap();
    assert_eq!(advance.next, NextStep::TournamentFinished);
    assert_eq!(manager.active_tournament_count().await, 0);
}

#[tokio::test]
async fn test_only_organizer_or_admin_may_manage() {
    let manager = manager_with(Arc::new(InMemoryTournamentRepository::new()));

    let rejection = manager
        .create_tournament(7, event(TournamentSettings::default()))
        .await
        .unwrap_err();
    assert_eq!(rejection.error.kind(), "unauthorized");

    let id = manager
        .create_tournament(ADMIN, event(TournamentSettings::default()))
        .await
        .unwrap()
        .id;

    let rejection = manager.approve(7, id).await.unwrap_err();
    assert_eq!(rejection.error.kind(), "unauthorized");
    assert!(rejection.state.is_none());

    manager.approve(ORGANIZER, id).await.unwrap();

    // Registration is self-service
    manager.register(id, 7, "walk-in".to_string(), None).await.unwrap();
}

#[tokio::test]
async fn test_rejections_carry_current_state() {
    let manager = manager_with(Arc::new(InMemoryTournamentRepository::new()));
    let id = manager
        .create_tournament(ORGANIZER, event(TournamentSettings::default()))
        .await
        .unwrap()
        .id;

    let before = manager.snapshot(id).await.unwrap();
    let rejection = manager.start(ORGANIZER, id).await.unwrap_err();
    assert_eq!(rejection.error.kind(), "invalid_state");

    let state = rejection.state.unwrap();
    assert_eq!(state.phase, TournamentPhase::Registration);
    assert_eq!(state.version, before.version);
}

#[tokio::test]
async fn test_double_submission_conflicts() {
    let manager = manager_with(Arc::new(InMemoryTournamentRepository::new()));
    let id = ready_tournament(&manager, 2, TournamentSettings::default()).await;
    let round_id = manager.start(ORGANIZER, id).await.unwrap().first_round_id;
    let round = manager.start_round(ORGANIZER, id, round_id).await.unwrap();
    let match_id = round.matches[0].id;
    manager.start_match(ORGANIZER, id, match_id).await.unwrap();

    let first = manager.submit_result(ORGANIZER, id, match_id, 2, 0).await.unwrap();
    let rejection = manager
        .submit_result(ORGANIZER, id, match_id, 0, 2)
        .await
        .unwrap_err();
    assert_eq!(rejection.error.kind(), "conflict");

    let tournament = manager.tournament(id).await.unwrap();
    let (_, stored) = tournament.find_match(match_id).unwrap();
    assert_eq!(stored.winner, first.winner);
}

#[tokio::test]
async fn test_concurrent_write_is_detected_and_reloaded() {
    let repository = Arc::new(InMemoryTournamentRepository::new());
    let manager = manager_with(repository.clone());
    let id = manager
        .create_tournament(ORGANIZER, event(TournamentSettings::default()))
        .await
        .unwrap()
        .id;

    // Another process approves the tournament behind the actor's back
    let mut other = repository.load(id).await.unwrap();
    let expected = other.version;
    other.version += 1;
    other.approved = true;
    repository.save(&other, expected).await.unwrap();

    let rejection = manager
        .register(id, 200, "late".to_string(), None)
        .await
        .unwrap_err();
    assert_eq!(rejection.error.kind(), "conflict");

    // The actor picked up the stored state and accepts the retry
    let snapshot = manager.snapshot(id).await.unwrap();
    assert!(snapshot.approved);
    manager.register(id, 200, "late".to_string(), None).await.unwrap();
}

#[tokio::test]
async fn test_notifications_follow_commands() {
    let (notifier, mut events) = ChannelNotifier::new(32);
    let manager = TournamentManager::new(
        Arc::new(InMemoryTournamentRepository::new()),
        Arc::new(OrganizerOrAdmin::default()),
        Arc::new(notifier),
        config(),
    );
    let id = ready_tournament(&manager, 3, TournamentSettings::default()).await;
    let started = manager.start(ORGANIZER, id).await.unwrap();

    assert_eq!(
        events.recv().await,
        Some(TournamentEvent::TournamentStarted {
            tournament_id: id,
            swiss_rounds: 3,
            top_cut_size: None,
        })
    );
    assert_eq!(
        events.recv().await,
        Some(TournamentEvent::PairingsPublished {
            tournament_id: id,
            round_id: started.first_round_id,
            matches: 2,
        })
    );
}

#[tokio::test]
async fn test_unfinished_tournaments_reload_on_startup() {
    let repository = Arc::new(InMemoryTournamentRepository::new());
    let id = {
        let manager = manager_with(repository.clone());
        let id = ready_tournament(&manager, 2, TournamentSettings::default()).await;
        manager.start(ORGANIZER, id).await.unwrap();
        manager.shutdown().await;
        id
    };

    let manager = manager_with(repository);
    assert_eq!(manager.load_existing_tournaments().await.unwrap(), 1);
    assert_eq!(manager.active_tournament_count().await, 1);
    assert_eq!(manager.snapshot(id).await.unwrap().phase, TournamentPhase::Swiss);

    let missing = manager.snapshot(404).await.unwrap_err();
    assert_eq!(missing.error.kind(), "not_found");
}

#[tokio::test]
#[serial]
#[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
async fn test_postgres_repository_round_trip() {
    use tcg_tournament::db::{Database, DatabaseConfig, PgTournamentRepository};
    use tcg_tournament::tournament::Tournament;

    let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
    let db = Database::new(&config).await.unwrap();
    db.ensure_schema().await.unwrap();
    let repository = PgTournamentRepository::new(
        db.pool().clone(),
        std::time::Duration::from_secs(config.query_timeout_secs),
    );

    let id = repository.next_id().await.unwrap();
    let mut tournament = Tournament::new(
        id,
        "Postgres Open".to_string(),
        ORGANIZER,
        TournamentSettings::default(),
        chrono::Utc::now(),
    );
    repository.insert(&tournament).await.unwrap();

    tournament.approve().unwrap();
    tournament.version = 1;
    repository.save(&tournament, 0).await.unwrap();

    let loaded = repository.load(id).await.unwrap();
    assert!(loaded.approved);
    assert_eq!(loaded.version, 1);
    assert!(repository.save(&tournament, 0).await.is_err());

    db.close().await;
}
