//! Registration roster: participants, check-in and seeding.

pub mod models;
pub mod roster;

pub use models::{Registration, RegistrationId, RegistrationStatus, TournamentStats};
pub use roster::{
    assign_seed_numbers, find_confirmed_participants, find_registration, find_registration_mut,
};
