//! Tournament engine: one async actor per tournament.
//!
//! This module implements:
//! - TournamentActor: single writer of one tournament aggregate
//! - TournamentManager: spawns actors, authorizes and routes commands
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each tournament runs in its own Tokio task with an mpsc inbox, so commands
//! against one tournament are applied strictly in arrival order. Every
//! accepted command is persisted with an optimistic version check before the
//! actor's live state changes. Refused commands come back as a [`Rejection`]
//! carrying the tournament's current snapshot.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tcg_tournament::collaborators::{LogNotifier, OrganizerOrAdmin};
//! use tcg_tournament::db::InMemoryTournamentRepository;
//! use tcg_tournament::engine::{EngineConfig, TournamentManager};
//! use tcg_tournament::tournament::{Event, EventDetails, TournamentSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TournamentManager::new(
//!         Arc::new(InMemoryTournamentRepository::new()),
//!         Arc::new(OrganizerOrAdmin::default()),
//!         Arc::new(LogNotifier),
//!         EngineConfig::default(),
//!     );
//!
//!     let event = Event {
//!         name: "Saturday Swiss".to_string(),
//!         description: None,
//!         organizer_id: 7,
//!         starts_at: None,
//!         location: None,
//!         details: EventDetails::Tournament(TournamentSettings::default()),
//!     };
//!     let snapshot = manager.create_tournament(7, event).await.unwrap();
//!     manager.approve(7, snapshot.id).await.unwrap();
//!     manager.shutdown().await;
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{TournamentActor, TournamentHandle};
pub use config::EngineConfig;
pub use manager::TournamentManager;
pub use messages::{Rejection, Responder, TournamentMessage, TournamentReply};
