use alloy_primitives::{Address, B256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::merkle::keccak256;

/// Length of a recoverable secp256k1 signature: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LEN: usize = 65;

/// Blocks a pending commitment must wait before it can be completed.
pub const DEFAULT_WAIT_PERIOD: u64 = 45;

/// Randomly selected co-signers required on top of the initial claimant.
pub const DEFAULT_REQUIRED_SIGNATURES: usize = 1;

/// Errors decoding a canonical (RLP) encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid RLP encoding: {0}")]
    Rlp(String),

    #[error("Unexpected {0} trailing bytes after encoded value")]
    TrailingBytes(usize),
}

impl From<alloy_rlp::Error> for CodecError {
    fn from(e: alloy_rlp::Error) -> Self {
        CodecError::Rlp(e.to_string())
    }
}

/// The payload remote validators sign: the MMR root of the remote chain at
/// `block_number`, attested by validator set `validator_set_id`.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable, RlpDecodable, Serialize, Deserialize)]
pub struct Commitment {
    pub mmr_root: B256,
    pub block_number: u64,
    pub validator_set_id: u64,
}

impl Commitment {
    /// Canonical encoding; the commitment hash is keccak256 over these bytes.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode_payload())
    }

    /// Decode a payload, rejecting anything but exactly one commitment.
    pub fn decode_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let mut buf = payload;
        let commitment = Self::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(CodecError::TrailingBytes(buf.len()));
        }
        Ok(commitment)
    }
}

/// The committed validator set of the remote chain.
/// Only the Merkle root of the members' addresses is stored; each member is
/// proved against it on use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    /// Remote validator-set id; commitments must reference it.
    pub id: u64,
    /// MMR root over `keccak256(address)` of every validator, in index order.
    #[serde(with = "crate::types::hex_hash")]
    pub root: [u8; 32],
    /// Number of validators in the set.
    pub length: usize,
}

/// Which validators have contributed a verified signature, one bit per index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitfield(BitVec<u8, Lsb0>);

impl Bitfield {
    /// All-zero bitfield for a validator set of `len` members.
    pub fn new(len: usize) -> Self {
        Self(bitvec![u8, Lsb0; 0; len])
    }

    /// Bitfield of `len` bits with exactly `indices` set. Out-of-range
    /// indices are ignored.
    pub fn from_indices(len: usize, indices: &[usize]) -> Self {
        let mut bitfield = Self::new(len);
        for &index in indices {
            bitfield.set(index);
        }
        bitfield
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_set(&self, index: usize) -> bool {
        index < self.0.len() && self.0[index]
    }

    pub fn set(&mut self, index: usize) {
        if index < self.0.len() {
            self.0.set(index, true);
        }
    }

    pub fn count_ones(&self) -> usize {
        self.0.count_ones()
    }

    pub fn set_indices(&self) -> Vec<usize> {
        self.0.iter_ones().collect()
    }

    pub fn unset_indices(&self) -> Vec<usize> {
        self.0.iter_zeros().collect()
    }
}

impl fmt::Display for Bitfield {
    /// Index 0 first, e.g. `10` for a two-validator set where only 0 signed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0.iter() {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Lifecycle of a commitment claim, derived from the pending entry and the
/// current block rather than stored on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentStatus {
    /// Admitted, waiting for (or past) its wait window.
    Open,
    /// Completed; the MMR root it carried has been published.
    Finalized,
    /// Never completed within the configured expiry period.
    Expired,
}

/// A claim admitted by `new_signature_commitment`, waiting to be completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommitment {
    pub id: u64,
    #[serde(with = "crate::types::hex_hash")]
    pub commitment_hash: [u8; 32],
    pub bitfield: Bitfield,
    pub created_at_block: u64,
    /// Validator whose signature admitted the claim.
    pub claimant_index: usize,
    pub claimant: Address,
}

impl PendingCommitment {
    /// First block at which the commitment may be queried or completed.
    pub fn ready_at(&self, wait_period: u64) -> u64 {
        self.created_at_block.saturating_add(wait_period)
    }

    /// Block whose hash seeds co-signer selection: the last block of the
    /// wait window, unknown to the claimant when it submitted.
    pub fn seed_block(&self, wait_period: u64) -> u64 {
        self.ready_at(wait_period).saturating_sub(1)
    }

    /// Block at which an uncompleted commitment expires, if expiry is enabled.
    pub fn expires_at(&self, expiry_period: Option<u64>) -> Option<u64> {
        expiry_period.map(|period| self.created_at_block.saturating_add(period))
    }

    pub fn is_expired(&self, current_block: u64, expiry_period: Option<u64>) -> bool {
        self.expires_at(expiry_period)
            .map_or(false, |expires_at| current_block >= expires_at)
    }
}
