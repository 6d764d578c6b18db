//! HTTP server for the TCG tournament engine.
//!
//! The binary wires configuration, logging, metrics and persistence around a
//! [`tcg_tournament::TournamentManager`] and serves the [`api`] router.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
