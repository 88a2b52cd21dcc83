use alloy_primitives::Address;

use crate::error::BridgeError;
use crate::merkle::{check_inclusion, keccak256, MerkleMountainRange};
use crate::types::ValidatorSet;

/// Leaf committing to one validator: keccak256 of its address.
pub fn validator_leaf(address: &Address) -> [u8; 32] {
    keccak256(address.as_slice())
}

/// Build the validator set whose root commits to `addresses` in index order.
pub fn build_validator_set(id: u64, addresses: &[Address]) -> ValidatorSet {
    let mmr = MerkleMountainRange::from_leaves(addresses.iter().map(validator_leaf));
    ValidatorSet {
        id,
        root: mmr.root(),
        length: addresses.len(),
    }
}

/// Proofs of membership for every address, in index order.
pub fn validator_proofs(addresses: &[Address]) -> Vec<Vec<[u8; 32]>> {
    let mmr = MerkleMountainRange::from_leaves(addresses.iter().map(validator_leaf));
    (0..mmr.leaf_count())
        .filter_map(|index| mmr.proof(index).ok().map(|proof| proof.items))
        .collect()
}

/// Holds the committed validator-set root and answers membership questions.
/// Members are never stored; each claim carries its own proof.
#[derive(Clone, Debug)]
pub struct ValidatorSetRegistry {
    set: ValidatorSet,
}

impl ValidatorSetRegistry {
    pub fn new(set: ValidatorSet) -> Self {
        Self { set }
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.set
    }

    pub fn id(&self) -> u64 {
        self.set.id
    }

    pub fn len(&self) -> usize {
        self.set.length
    }

    pub fn is_empty(&self) -> bool {
        self.set.length == 0
    }

    /// Whether `proof` places `address` at `index` under the committed root.
    pub fn verify_member(&self, address: &Address, index: usize, proof: &[[u8; 32]]) -> bool {
        self.check_member(address, index, proof).is_ok()
    }

    /// Like [`Self::verify_member`], with the reason for a rejection.
    pub fn check_member(
        &self,
        address: &Address,
        index: usize,
        proof: &[[u8; 32]],
    ) -> Result<(), BridgeError> {
        if index >= self.set.length {
            return Err(BridgeError::ValidatorIndexOutOfRange {
                index,
                length: self.set.length,
            });
        }

        check_inclusion(
            &validator_leaf(address),
            index as u64,
            self.set.length as u64,
            proof,
            &self.set.root,
        )
        .map_err(|source| BridgeError::InvalidMembershipProof { index, source })
    }
}
