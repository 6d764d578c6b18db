//! External collaborators: authorization and notification delivery.

pub mod authorizer;
pub mod notifications;

pub use authorizer::{Authorizer, OrganizerOrAdmin};
pub use notifications::{ChannelNotifier, LogNotifier, NotificationSink, TournamentEvent};
