//! Merkle Mountain Range inclusion proofs.
//!
//! An MMR over `n` leaves is a row of perfect binary trees ("mountains"), one
//! per set bit of `n`, tallest first. Appending a leaf only ever merges
//! mountains to its right, so a leaf keeps its index forever. The root bags
//! the mountain peaks right to left: `H(p0, H(p1, ... H(pk-1, pk)))`.
//!
//! A proof for leaf `i` is the sibling path inside its own mountain
//! (bottom-up) followed by the peaks of every other mountain, left to right.
//! With a single mountain the MMR root equals a plain Merkle root, which is
//! how validator-set roots are committed.

use crate::merkle::hash_pair;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while folding an MMR proof.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Cannot prove inclusion in an empty tree")]
    EmptyTree,

    #[error("Leaf index {index} out of range for {leaf_count} leaves")]
    LeafIndexOutOfRange { index: u64, leaf_count: u64 },

    #[error("Proof has {got} items, expected exactly {expected}")]
    ProofLength { expected: usize, got: usize },

    #[error("Proof verification failed: computed root {computed} does not match expected root {expected}")]
    RootMismatch { computed: String, expected: String },
}

/// A leaf position plus the hashes needed to authenticate it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmrProof {
    pub leaf_index: u64,
    pub leaf_count: u64,
    pub items: Vec<[u8; 32]>,
}

/// (first leaf index, height) of every mountain, left to right.
fn mountains(leaf_count: u64) -> Vec<(u64, u32)> {
    let mut result = Vec::with_capacity(leaf_count.count_ones() as usize);
    let mut start = 0u64;
    for height in (0..u64::BITS).rev() {
        let size = 1u64 << height;
        if leaf_count & size != 0 {
            result.push((start, height));
            start += size;
        }
    }
    result
}

fn bag_peaks(peaks: &[[u8; 32]]) -> [u8; 32] {
    let (last, rest) = match peaks.split_last() {
        Some(split) => split,
        None => return [0u8; 32],
    };
    rest.iter()
        .rev()
        .fold(*last, |acc, peak| hash_pair(peak, &acc))
}

/// Recompute the MMR root implied by `leaf` sitting at `index` of `leaf_count`.
pub fn compute_root(
    leaf: &[u8; 32],
    index: u64,
    leaf_count: u64,
    proof: &[[u8; 32]],
) -> Result<[u8; 32], ProofError> {
    if leaf_count == 0 {
        return Err(ProofError::EmptyTree);
    }
    if index >= leaf_count {
        return Err(ProofError::LeafIndexOutOfRange { index, leaf_count });
    }

    let mountains = mountains(leaf_count);
    let (own, &(start, height)) = mountains
        .iter()
        .enumerate()
        .find(|(_, (start, height))| index < *start + (1u64 << *height))
        .ok_or(ProofError::LeafIndexOutOfRange { index, leaf_count })?;

    let expected = height as usize + mountains.len() - 1;
    if proof.len() != expected {
        return Err(ProofError::ProofLength {
            expected,
            got: proof.len(),
        });
    }

    let (path, other_peaks) = proof.split_at(height as usize);
    let local = index - start;
    let mut current = *leaf;
    for (level, sibling) in path.iter().enumerate() {
        current = if (local >> level) & 1 == 1 {
            hash_pair(sibling, &current)
        } else {
            hash_pair(&current, sibling)
        };
    }

    let mut peaks = Vec::with_capacity(mountains.len());
    peaks.extend_from_slice(&other_peaks[..own]);
    peaks.push(current);
    peaks.extend_from_slice(&other_peaks[own..]);

    Ok(bag_peaks(&peaks))
}

/// Verify `leaf` is the `index`-th of `leaf_count` leaves committed to by `root`.
pub fn verify_inclusion(
    leaf: &[u8; 32],
    index: u64,
    leaf_count: u64,
    proof: &[[u8; 32]],
    root: &[u8; 32],
) -> bool {
    check_inclusion(leaf, index, leaf_count, proof, root).is_ok()
}

/// Like [`verify_inclusion`], but reports why a proof was rejected.
pub fn check_inclusion(
    leaf: &[u8; 32],
    index: u64,
    leaf_count: u64,
    proof: &[[u8; 32]],
    root: &[u8; 32],
) -> Result<(), ProofError> {
    let computed = compute_root(leaf, index, leaf_count, proof)?;
    if computed != *root {
        return Err(ProofError::RootMismatch {
            computed: hex::encode(computed),
            expected: hex::encode(root),
        });
    }
    Ok(())
}

/// Append-only accumulator producing roots and proofs in the layout
/// [`compute_root`] folds. Relayer tooling uses it to build validator-set
/// roots and message-leaf proofs.
#[derive(Clone, Debug, Default)]
pub struct MerkleMountainRange {
    leaves: Vec<[u8; 32]>,
}

impl MerkleMountainRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_leaves<I: IntoIterator<Item = [u8; 32]>>(leaves: I) -> Self {
        Self {
            leaves: leaves.into_iter().collect(),
        }
    }

    /// Append a leaf and return its index.
    pub fn push(&mut self, leaf: [u8; 32]) -> u64 {
        self.leaves.push(leaf);
        self.leaves.len() as u64 - 1
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn peaks(&self) -> Vec<[u8; 32]> {
        mountains(self.leaf_count())
            .into_iter()
            .map(|(start, height)| self.mountain_root(start, height))
            .collect()
    }

    /// Root over all leaves; all-zero for an empty range.
    pub fn root(&self) -> [u8; 32] {
        bag_peaks(&self.peaks())
    }

    pub fn proof(&self, index: u64) -> Result<MmrProof, ProofError> {
        let leaf_count = self.leaf_count();
        if leaf_count == 0 {
            return Err(ProofError::EmptyTree);
        }
        if index >= leaf_count {
            return Err(ProofError::LeafIndexOutOfRange { index, leaf_count });
        }

        let mut items = Vec::new();
        let mut other_peaks = Vec::new();
        for (start, height) in mountains(leaf_count) {
            if index >= start && index < start + (1u64 << height) {
                items.extend(self.mountain_path(start, height, index - start));
            } else {
                other_peaks.push(self.mountain_root(start, height));
            }
        }
        items.extend(other_peaks);

        Ok(MmrProof {
            leaf_index: index,
            leaf_count,
            items,
        })
    }

    fn mountain_leaves(&self, start: u64, height: u32) -> Vec<[u8; 32]> {
        let start = start as usize;
        self.leaves[start..start + (1usize << height)].to_vec()
    }

    fn mountain_root(&self, start: u64, height: u32) -> [u8; 32] {
        let mut level = self.mountain_leaves(start, height);
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
        }
        level[0]
    }

    fn mountain_path(&self, start: u64, height: u32, local: u64) -> Vec<[u8; 32]> {
        let mut level = self.mountain_leaves(start, height);
        let mut position = local as usize;
        let mut path = Vec::with_capacity(height as usize);
        while level.len() > 1 {
            path.push(level[position ^ 1]);
            level = level
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            position /= 2;
        }
        path
    }
}
