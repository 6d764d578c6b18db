//! Single-elimination (top cut) pairing.

use super::{Pairing, pair_consecutively};
use crate::registration::RegistrationId;

/// First bracket round: rank 1 vs rank N, rank 2 vs rank N-1, ...
///
/// `ranked` is the standings order; only the first `size` entries play.
pub fn seeded_bracket(ranked: &[RegistrationId], size: usize) -> Vec<Pairing> {
    let field = &ranked[..size.min(ranked.len())];
    let half = field.len() / 2;

    let mut pairings: Vec<Pairing> = (0..half)
        .map(|i| Pairing::new(field[i], field[field.len() - 1 - i]))
        .collect();

    if field.len() % 2 == 1 {
        pairings.push(Pairing::bye(field[half]));
    }

    pairings
}

/// Later bracket rounds: winners paired in the order they are given
pub fn advance_winners(winners: &[RegistrationId]) -> Vec<Pairing> {
    pair_consecutively(winners)
}

/// Bracket size actually usable for `participants` players.
///
/// A configured size larger than the field shrinks to the largest power of
/// two the field can fill; fewer than two players means no bracket.
pub fn effective_cut_size(configured: u32, participants: usize) -> Option<u32> {
    let cap = configured.min(u32::try_from(participants).unwrap_or(u32::MAX));
    if cap < 2 {
        return None;
    }
    Some(1 << (u32::BITS - 1 - cap.leading_zeros()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_four_bracket() {
        let pairings = seeded_bracket(&[11, 12, 13, 14, 15, 16], 4);
        assert_eq!(pairings, vec![Pairing::new(11, 14), Pairing::new(12, 13)]);
    }

    #[test]
    fn test_top_eight_bracket() {
        let ranked: Vec<RegistrationId> = (1..=10).collect();
        let pairings = seeded_bracket(&ranked, 8);
        assert_eq!(
            pairings,
            vec![
                Pairing::new(1, 8),
                Pairing::new(2, 7),
                Pairing::new(3, 6),
                Pairing::new(4, 5)
            ]
        );
    }

    #[test]
    fn test_advance_winners_in_order() {
        assert_eq!(
            advance_winners(&[1, 4, 2, 3]),
            vec![Pairing::new(1, 4), Pairing::new(2, 3)]
        );
    }

    #[test]
    fn test_effective_cut_size() {
        assert_eq!(effective_cut_size(8, 40), Some(8));
        assert_eq!(effective_cut_size(8, 6), Some(4));
        assert_eq!(effective_cut_size(4, 3), Some(2));
        assert_eq!(effective_cut_size(4, 1), None);
        assert_eq!(effective_cut_size(2, 2), Some(2));
    }
}
