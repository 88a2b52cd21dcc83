//! Random co-signer selection.
//!
//! A claimant controlling one key must also produce signatures from
//! validators it could not predict when it submitted. The seed is the hash of
//! the last block of the wait window mixed with the commitment id: unknown at
//! submission, fixed and publicly recomputable once that block exists.

use std::collections::BTreeSet;

use crate::merkle::{hash_pair, keccak256};
use crate::types::Bitfield;

/// Seed for commitment `id` from the hash of its seed block.
pub fn selection_seed(seed_block_hash: &[u8; 32], id: u64) -> [u8; 32] {
    let mut data = [0u8; 40];
    data[..32].copy_from_slice(seed_block_hash);
    data[32..].copy_from_slice(&id.to_be_bytes());
    keccak256(&data)
}

/// Derives the validators that must co-sign a pending commitment.
#[derive(Clone, Copy, Debug)]
pub struct RandomValidatorSelector {
    required_signatures: usize,
}

impl RandomValidatorSelector {
    pub fn new(required_signatures: usize) -> Self {
        Self {
            required_signatures,
        }
    }

    pub fn required_signatures(&self) -> usize {
        self.required_signatures
    }

    /// Indices below `validator_set_length` not set in `bitfield`, drawn
    /// without replacement. Draws `min(required_signatures, candidates)`.
    pub fn required_indices(
        &self,
        seed: &[u8; 32],
        bitfield: &Bitfield,
        validator_set_length: usize,
    ) -> BTreeSet<usize> {
        let mut candidates: Vec<usize> = (0..validator_set_length)
            .filter(|&index| !bitfield.is_set(index))
            .collect();

        let draws = self.required_signatures.min(candidates.len());
        let mut selected = BTreeSet::new();
        for round in 0..draws {
            let mut counter = [0u8; 32];
            counter[24..].copy_from_slice(&(round as u64).to_be_bytes());
            let entropy = hash_pair(seed, &counter);

            let mut word = [0u8; 8];
            word.copy_from_slice(&entropy[..8]);
            let pick = (u64::from_be_bytes(word) % candidates.len() as u64) as usize;
            selected.insert(candidates.swap_remove(pick));
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let selector = RandomValidatorSelector::new(3);
        let seed = selection_seed(&[0x5A; 32], 9);
        let bitfield = Bitfield::from_indices(16, &[4]);
        assert_eq!(
            selector.required_indices(&seed, &bitfield, 16),
            selector.required_indices(&seed, &bitfield, 16)
        );
    }

    #[test]
    fn test_never_selects_claimed_bits() {
        let selector = RandomValidatorSelector::new(5);
        let bitfield = Bitfield::from_indices(8, &[0, 2, 7]);
        for id in 0..50 {
            let seed = selection_seed(&[0x11; 32], id);
            let selected = selector.required_indices(&seed, &bitfield, 8);
            assert_eq!(selected.len(), 5);
            assert!(selected.iter().all(|&i| !bitfield.is_set(i) && i < 8));
        }
    }

    #[test]
    fn test_two_validators_picks_the_other() {
        let selector = RandomValidatorSelector::new(1);
        let seed = selection_seed(&[0x22; 32], 0);
        let selected = selector.required_indices(&seed, &Bitfield::from_indices(2, &[0]), 2);
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_capped_by_candidates() {
        let selector = RandomValidatorSelector::new(10);
        let seed = selection_seed(&[0x33; 32], 1);
        let selected = selector.required_indices(&seed, &Bitfield::from_indices(3, &[1]), 3);
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_seed_depends_on_id_and_block() {
        let base = selection_seed(&[0x44; 32], 1);
        assert_ne!(base, selection_seed(&[0x44; 32], 2));
        assert_ne!(base, selection_seed(&[0x45; 32], 1));
    }

    #[test]
    fn test_selection_varies_across_ids() {
        let selector = RandomValidatorSelector::new(1);
        let bitfield = Bitfield::from_indices(64, &[0]);
        let picks: BTreeSet<usize> = (0..32)
            .flat_map(|id| selector.required_indices(&selection_seed(&[0x66; 32], id), &bitfield, 64))
            .collect();
        assert!(picks.len() > 1);
    }
}
