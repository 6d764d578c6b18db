//! Fire-and-forget tournament notifications.

use crate::matches::MatchId;
use crate::registration::RegistrationId;
use crate::round::{RoundId, RoundType};
use crate::tournament::TournamentId;
use serde::Serialize;
use tokio::sync::mpsc;

/// Something participants or staff may want to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TournamentEvent {
    TournamentStarted {
        tournament_id: TournamentId,
        swiss_rounds: u32,
        top_cut_size: Option<u32>,
    },
    PairingsPublished {
        tournament_id: TournamentId,
        round_id: RoundId,
        matches: usize,
    },
    RoundStarted {
        tournament_id: TournamentId,
        round_id: RoundId,
        round_type: RoundType,
        number: u32,
    },
    /// Alert only: nothing is finished automatically
    RoundOvertime {
        tournament_id: TournamentId,
        round_id: RoundId,
        unfinished_matches: usize,
    },
    RoundFinished {
        tournament_id: TournamentId,
        round_id: RoundId,
        forced_matches: usize,
    },
    MatchFinished {
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: Option<RegistrationId>,
    },
    PlayerDisqualified {
        tournament_id: TournamentId,
        registration_id: RegistrationId,
        reason: String,
    },
    TournamentFinished {
        tournament_id: TournamentId,
        winner: Option<RegistrationId>,
    },
}

/// Delivery of [`TournamentEvent`]s. Must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: TournamentEvent);
}

/// Writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: TournamentEvent) {
        log::info!("Notification: {:?}", event);
    }
}

/// Forwards events to a bounded channel, dropping them when it is full
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<TournamentEvent>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TournamentEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, event: TournamentEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::warn!("Notification channel full, dropping {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Notification channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new(4);
        notifier.notify(TournamentEvent::TournamentFinished {
            tournament_id: 1,
            winner: Some(3),
        });

        assert_eq!(
            rx.recv().await,
            Some(TournamentEvent::TournamentFinished {
                tournament_id: 1,
                winner: Some(3)
            })
        );
    }

    #[tokio::test]
    async fn test_channel_notifier_drops_when_full() {
        let (notifier, mut rx) = ChannelNotifier::new(1);
        for round_id in 1..=3 {
            notifier.notify(TournamentEvent::RoundFinished {
                tournament_id: 1,
                round_id,
                forced_matches: 0,
            });
        }

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(TournamentEvent::RoundOvertime {
            tournament_id: 1,
            round_id: 2,
            unfinished_matches: 3,
        })
        .unwrap();
        assert_eq!(json["event"], "round_overtime");
    }
}
