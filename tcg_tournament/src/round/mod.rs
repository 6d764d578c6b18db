//! Rounds: matches played concurrently under one time limit.

pub mod errors;
pub mod models;

pub use errors::{RoundError, RoundResult};
pub use models::{Round, RoundId, RoundStatus, RoundType};
