//! # TCG Tournament
//!
//! A Swiss-system tournament engine for trading card game events.
//!
//! A tournament is an aggregate of registrations, rounds and matches that
//! moves through a fixed sequence of phases:
//!
//! - **Registration**: players register and check in
//! - **Swiss**: a fixed number of rounds paired by standing
//! - **TopCut**: optional single-elimination bracket for the best players
//! - **Finished**: standings frozen
//!
//! Standings are derived from match history (3 points per win, 1 per draw)
//! and tie-broken by opponents' match-win %, game-win % and opponents'
//! game-win %, each floored at 1/3.
//!
//! ## Core Modules
//!
//! - [`tournament`]: The aggregate and its phase state machine
//! - [`pairing`]: Swiss and elimination pairing algorithms
//! - [`standings`]: Statistics and tiebreaker ranking
//! - [`engine`]: One async actor per tournament, with persistence
//! - [`db`]: PostgreSQL and in-memory repositories
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use tcg_tournament::{PreserveOrdering, Tournament, TournamentSettings};
//!
//! let now = Utc::now();
//! let mut tournament = Tournament::new(1, "League night".to_string(), 9, TournamentSettings::default(), now);
//! tournament.approve().unwrap();
//! tournament.register(1, "alice".to_string(), None, now).unwrap();
//! tournament.register(2, "bob".to_string(), None, now).unwrap();
//!
//! let outcome = tournament.start(&mut PreserveOrdering, now).unwrap();
//! assert_eq!(outcome.swiss_rounds, 3);
//! ```

/// Authorization and notification collaborators.
pub mod collaborators;

/// Database connection pool and tournament repositories.
pub mod db;

/// Tournament actors and the manager routing commands to them.
pub mod engine;

/// Matches and result reporting.
pub mod matches;

/// Pairing algorithms.
pub mod pairing;

/// Player registrations.
pub mod registration;

/// Rounds of play.
pub mod round;

/// Standings and tiebreakers.
pub mod standings;

/// Tournament aggregate and state machine.
pub mod tournament;

pub use engine::{EngineConfig, Rejection, TournamentManager, TournamentReply};
pub use matches::{Match, MatchId, MatchStatus};
pub use pairing::{OrderingStrategy, Pairing, PreserveOrdering, RandomOrdering};
pub use registration::{Registration, RegistrationId, RegistrationStatus, TournamentStats};
pub use round::{Round, RoundId, RoundStatus, RoundType};
pub use standings::StandingEntry;
pub use tournament::{
    Event, EventDetails, TopCutPolicy, Tournament, TournamentError, TournamentId,
    TournamentPhase, TournamentSettings, TournamentSnapshot,
};
