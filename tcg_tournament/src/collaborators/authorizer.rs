//! Who may manage a tournament.

use async_trait::async_trait;
use std::collections::HashSet;

/// Authorization check consulted before any command reaches a tournament
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether `actor_id` may manage a tournament organized by `organizer_id`
    async fn can_manage(&self, actor_id: i64, organizer_id: i64) -> bool;
}

/// The organizer manages their own tournaments; admins manage all of them
#[derive(Debug, Clone, Default)]
pub struct OrganizerOrAdmin {
    admins: HashSet<i64>,
}

impl OrganizerOrAdmin {
    pub fn new(admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, actor_id: i64) -> bool {
        self.admins.contains(&actor_id)
    }
}

#[async_trait]
impl Authorizer for OrganizerOrAdmin {
    async fn can_manage(&self, actor_id: i64, organizer_id: i64) -> bool {
        actor_id == organizer_id || self.is_admin(actor_id)
    }
}
