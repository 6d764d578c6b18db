//! Standings: ranking participants by match points and tiebreakers.

pub mod calculator;

pub use calculator::{
    POINTS_PER_DRAW, POINTS_PER_WIN, StandingEntry, StandingKey, TIEBREAKER_FLOOR, compute_stats,
    rank, refresh,
};
