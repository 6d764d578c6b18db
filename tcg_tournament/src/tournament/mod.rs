//! Tournaments: the aggregate, its settings and the phase state machine.
//!
//! A [`Tournament`] owns its registrations, rounds and matches and moves
//! through REGISTRATION -> SWISS -> TOP_CUT -> FINISHED. The top cut is
//! skipped when the field is too small or the organizer disabled it.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use tcg_tournament::pairing::RandomOrdering;
//! use tcg_tournament::tournament::{Tournament, TournamentPhase, TournamentSettings};
//!
//! let now = Utc::now();
//! let mut tournament = Tournament::new(1, "Friday Swiss".to_string(), 42, TournamentSettings::default(), now);
//! tournament.approve().unwrap();
//! for user_id in 1..=6 {
//!     tournament.register(user_id, format!("player{user_id}"), None, now).unwrap();
//! }
//!
//! let outcome = tournament.start(&mut RandomOrdering::seeded(7), now).unwrap();
//! assert_eq!(outcome.phase, TournamentPhase::Swiss);
//! assert_eq!(outcome.swiss_rounds, 3);
//! ```

pub mod controller;
pub mod errors;
pub mod event;
pub mod models;

pub use controller::{
    CorrectionOutcome, DisqualificationOutcome, MIN_PARTICIPANTS, NextStep, RoundAdvance,
    StartOutcome, auto_top_cut_size, swiss_rounds_for,
};
pub use errors::{TournamentError, TournamentResult};
pub use event::{Event, EventDetails};
pub use models::{
    DEFAULT_BREAK_MINUTES, DEFAULT_MATCH_TIME_LIMIT_MINUTES, PrizePool, RoundSummary,
    TopCutPolicy, Tournament, TournamentFormat, TournamentId, TournamentPhase, TournamentSettings,
    TournamentSnapshot,
};
