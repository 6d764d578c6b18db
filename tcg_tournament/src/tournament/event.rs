//! Community events, some of which are tournaments.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Tournament, TournamentId, TournamentSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event-type specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventDetails {
    /// Casual play session
    Meetup,
    /// Set release event
    Release { set_code: Option<String> },
    /// Competitive event run by the Swiss engine
    Tournament(TournamentSettings),
}

/// A generic community event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub organizer_id: i64,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl Event {
    pub fn is_tournament(&self) -> bool {
        matches!(self.details, EventDetails::Tournament(_))
    }

    /// Build the tournament aggregate for a tournament event
    pub fn into_tournament(self, id: TournamentId, now: DateTime<Utc>) -> TournamentResult<Tournament> {
        let EventDetails::Tournament(settings) = self.details else {
            return Err(TournamentError::NotATournament);
        };
        if self.name.trim().is_empty() {
            return Err(TournamentError::Validation(
                "event name cannot be empty".to_string(),
            ));
        }
        settings.validate()?;

        let mut tournament = Tournament::new(id, self.name, self.organizer_id, settings, now);
        tournament.description = self.description;
        tournament.location = self.location;
        tournament.scheduled_start = self.starts_at;
        Ok(tournament)
    }
}
