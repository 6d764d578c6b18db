//! Roster queries and seeding over a tournament's registrations.

use super::models::{Registration, RegistrationId};
use crate::pairing::OrderingStrategy;

/// Participants eligible for pairing (`Registered` or `Confirmed`),
/// in registration order.
pub fn find_confirmed_participants(registrations: &[Registration]) -> Vec<&Registration> {
    registrations.iter().filter(|r| r.is_active()).collect()
}

/// Assign seeds 1..N to every eligible participant.
///
/// The order comes from `ordering`; it starts from registration order, so
/// [`crate::pairing::PreserveOrdering`] seeds first-come first-served.
/// Inactive registrations lose any previous seed.
///
/// Returns the number of seeded participants.
pub fn assign_seed_numbers(
    registrations: &mut [Registration],
    ordering: &mut dyn OrderingStrategy,
) -> usize {
    let mut ids: Vec<RegistrationId> = find_confirmed_participants(registrations)
        .iter()
        .map(|r| r.id)
        .collect();
    ordering.arrange(&mut ids);

    for registration in registrations.iter_mut() {
        registration.seed_number = ids
            .iter()
            .position(|&id| id == registration.id)
            .map(|idx| idx as u32 + 1);
    }

    log::debug!("Assigned seeds to {} participants", ids.len());
    ids.len()
}

/// Look up a registration by ID
pub fn find_registration(
    registrations: &[Registration],
    id: RegistrationId,
) -> Option<&Registration> {
    registrations.iter().find(|r| r.id == id)
}

/// Look up a registration by ID for mutation
pub fn find_registration_mut(
    registrations: &mut [Registration],
    id: RegistrationId,
) -> Option<&mut Registration> {
    registrations.iter_mut().find(|r| r.id == id)
}
