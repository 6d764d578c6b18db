//! Tournament repositories.
//!
//! The tournament aggregate is loaded and saved whole. Every save names the
//! version it was derived from; a store holding any other version rejects
//! the write with [`RepositoryError::VersionConflict`].

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::tournament::{Tournament, TournamentId};

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Tournament {0} not found")]
    NotFound(TournamentId),

    #[error("Tournament {0} already exists")]
    AlreadyExists(TournamentId),

    #[error("Tournament {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: TournamentId, expected: i64 },

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage for tournament aggregates
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Reserve a fresh tournament ID
    async fn next_id(&self) -> RepositoryResult<TournamentId>;

    /// Store a new tournament
    async fn insert(&self, tournament: &Tournament) -> RepositoryResult<()>;

    /// Load a tournament
    async fn load(&self, id: TournamentId) -> RepositoryResult<Tournament>;

    /// Replace a tournament if the stored version is `expected_version`.
    ///
    /// The stored version becomes `tournament.version`.
    async fn save(&self, tournament: &Tournament, expected_version: i64) -> RepositoryResult<()>;

    /// All tournaments, by ID
    async fn list(&self) -> RepositoryResult<Vec<Tournament>>;
}

/// Process-local repository, used when no database is configured and in tests
#[derive(Debug)]
pub struct InMemoryTournamentRepository {
    tournaments: RwLock<HashMap<TournamentId, Tournament>>,
    next_id: AtomicI64,
}

impl Default for InMemoryTournamentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self {
            tournaments: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn next_id(&self) -> RepositoryResult<TournamentId> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert(&self, tournament: &Tournament) -> RepositoryResult<()> {
        let mut tournaments = self.tournaments.write().await;
        if tournaments.contains_key(&tournament.id) {
            return Err(RepositoryError::AlreadyExists(tournament.id));
        }
        tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn load(&self, id: TournamentId) -> RepositoryResult<Tournament> {
        self.tournaments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn save(&self, tournament: &Tournament, expected_version: i64) -> RepositoryResult<()> {
        let mut tournaments = self.tournaments.write().await;
        let stored = tournaments
            .get_mut(&tournament.id)
            .ok_or(RepositoryError::NotFound(tournament.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                id: tournament.id,
                expected: expected_version,
            });
        }
        *stored = tournament.clone();
        Ok(())
    }

    async fn list(&self) -> RepositoryResult<Vec<Tournament>> {
        let mut all: Vec<Tournament> = self.tournaments.read().await.values().cloned().collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }
}

/// PostgreSQL repository storing each aggregate as one JSONB row
pub struct PgTournamentRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn timed<F, T>(&self, future: F) -> RepositoryResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(self.query_timeout, future).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RepositoryError::Timeout(self.query_timeout)),
        }
    }

    fn from_row(row: &sqlx::postgres::PgRow) -> RepositoryResult<Tournament> {
        let Json(mut tournament): Json<Tournament> = row.try_get("aggregate")?;
        tournament.version = row.try_get("version")?;
        Ok(tournament)
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn next_id(&self) -> RepositoryResult<TournamentId> {
        let row = self
            .timed(sqlx::query("SELECT nextval('tournament_id_seq') AS id").fetch_one(&self.pool))
            .await?;
        Ok(row.try_get("id")?)
    }

    async fn insert(&self, tournament: &Tournament) -> RepositoryResult<()> {
        let result = self
            .timed(
                sqlx::query(
                    r#"
                    INSERT INTO tournaments (id, name, organizer_id, phase, version, aggregate)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(tournament.id)
                .bind(&tournament.name)
                .bind(tournament.organizer_id)
                .bind(tournament.phase.to_string())
                .bind(tournament.version)
                .bind(Json(tournament))
                .execute(&self.pool),
            )
            .await;

        match result {
            Err(RepositoryError::Database(sqlx::Error::Database(e))) if e.is_unique_violation() => {
                Err(RepositoryError::AlreadyExists(tournament.id))
            }
            other => other.map(|_| ()),
        }
    }

    async fn load(&self, id: TournamentId) -> RepositoryResult<Tournament> {
        let row = self
            .timed(
                sqlx::query("SELECT aggregate, version FROM tournaments WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        Self::from_row(&row)
    }

    async fn save(&self, tournament: &Tournament, expected_version: i64) -> RepositoryResult<()> {
        let result = self
            .timed(
                sqlx::query(
                    r#"
                    UPDATE tournaments
                    SET name = $2, phase = $3, version = $4, aggregate = $5, updated_at = NOW()
                    WHERE id = $1 AND version = $6
                    "#,
                )
                .bind(tournament.id)
                .bind(&tournament.name)
                .bind(tournament.phase.to_string())
                .bind(tournament.version)
                .bind(Json(tournament))
                .bind(expected_version)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = self
            .timed(
                sqlx::query("SELECT 1 FROM tournaments WHERE id = $1")
                    .bind(tournament.id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .is_some();
        if exists {
            Err(RepositoryError::VersionConflict {
                id: tournament.id,
                expected: expected_version,
            })
        } else {
            Err(RepositoryError::NotFound(tournament.id))
        }
    }

    async fn list(&self) -> RepositoryResult<Vec<Tournament>> {
        let rows = self
            .timed(
                sqlx::query("SELECT aggregate, version FROM tournaments ORDER BY id")
                    .fetch_all(&self.pool),
            )
            .await?;
        rows.iter().map(Self::from_row).collect()
    }
}
