//! Ordering strategies for seeding and first-round pairing.

use crate::registration::RegistrationId;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Decides the order of participants where no score exists yet
/// (seed assignment and the first Swiss round).
pub trait OrderingStrategy: Send {
    /// Reorder participants in place
    fn arrange(&mut self, participants: &mut [RegistrationId]);
}

/// Uniformly random order
pub struct RandomOrdering {
    rng: StdRng,
}

impl RandomOrdering {
    /// Create an ordering seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible ordering
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomOrdering {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderingStrategy for RandomOrdering {
    fn arrange(&mut self, participants: &mut [RegistrationId]) {
        participants.shuffle(&mut self.rng);
    }
}

/// Keeps the order it is given (registration order or an admin-supplied list)
#[derive(Debug, Default, Clone, Copy)]
pub struct PreserveOrdering;

impl OrderingStrategy for PreserveOrdering {
    fn arrange(&mut self, _participants: &mut [RegistrationId]) {}
}
