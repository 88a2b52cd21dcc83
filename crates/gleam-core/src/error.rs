use std::fmt;
use thiserror::Error;

use crate::consensus::signature::SignatureError;
use crate::merkle::ProofError;
use crate::types::{ChannelId, CodecError};

/// Error message relayer tooling matches on to decide to keep waiting.
pub const WAIT_PERIOD_NOT_OVER: &str = "Error: Block wait period not over";

/// What a relayer should do about a rejected call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A Merkle proof did not resolve to the expected root. Resubmit with a correct proof.
    Membership,
    /// A signature did not verify or is missing. Resubmit with correct signatures.
    Signature,
    /// Too early. Wait and retry.
    Timing,
    /// Unknown, expired or already finalized entry. Abandon.
    State,
    /// Nonce mismatch or replay. Resync the channel nonce.
    Ordering,
    /// Recomputed hashes or encodings disagree with the supplied values.
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Membership => "MembershipError",
            ErrorKind::Signature => "SignatureError",
            ErrorKind::Timing => "TimingError",
            ErrorKind::State => "StateError",
            ErrorKind::Ordering => "OrderingError",
            ErrorKind::Validation => "ValidationError",
        };
        f.write_str(name)
    }
}

/// Every way a bridge operation can be rejected.
/// A rejected operation never leaves partial state behind.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Validator index {index} is out of range for a validator set of {length}")]
    ValidatorIndexOutOfRange { index: usize, length: usize },

    #[error("Invalid membership proof for validator {index}: {source}")]
    InvalidMembershipProof {
        index: usize,
        #[source]
        source: ProofError,
    },

    #[error("Invalid signature from validator {index}")]
    InvalidSignature { index: usize },

    #[error("Malformed signature from validator {index}: {source}")]
    MalformedSignature {
        index: usize,
        #[source]
        source: SignatureError,
    },

    #[error("Missing signature from required validator {index}")]
    MissingSignature { index: usize },

    #[error("Error: Block wait period not over")]
    WaitPeriodNotOver {
        created_at: u64,
        current: u64,
        wait_period: u64,
    },

    #[error("Selection seed from block {block} is not available yet")]
    SeedUnavailable { block: u64 },

    #[error("Selection seed block {block} is no longer served by the host chain")]
    SeedPruned { block: u64 },

    #[error("Commitment {id} is unknown or already finalized")]
    UnknownCommitment { id: u64 },

    #[error("Commitment {id} expired at block {expired_at}")]
    CommitmentExpired { id: u64, expired_at: u64 },

    #[error("Channel {0} is not configured")]
    UnknownChannel(ChannelId),

    #[error("Invalid nonce on {channel} channel: expected {expected}, got {got}")]
    NonceMismatch {
        channel: ChannelId,
        expected: u64,
        got: u64,
    },

    #[error("Channel {channel} nonce is exhausted at {last}")]
    NonceOverflow { channel: ChannelId, last: u64 },

    #[error("Bitfield length {got} does not match validator set length {expected}")]
    BitfieldLengthMismatch { expected: usize, got: usize },

    #[error("Initial claim bitfield must set only the claimant bit {claimant}, found {set_bits} bits set")]
    InvalidClaimBitfield { claimant: usize, set_bits: usize },

    #[error("Commitment payload hashes to {computed}, claimed {claimed}")]
    PayloadHashMismatch { computed: String, claimed: String },

    #[error("Commitment hash does not match the hash stored for commitment {id}")]
    CommitmentHashMismatch { id: u64 },

    #[error("Invalid commitment payload: {0}")]
    InvalidPayload(#[from] CodecError),

    #[error("Commitment is for validator set {got}, current set is {expected}")]
    ValidatorSetMismatch { expected: u64, got: u64 },

    #[error("Commitment for block {block_number} is not newer than finalized block {latest}")]
    StaleCommitment { block_number: u64, latest: u64 },

    #[error("Signature arrays differ in length: {signatures} signatures, {indices} indices, {pubkeys} public keys, {proofs} proofs")]
    MismatchedProofArrays {
        signatures: usize,
        indices: usize,
        pubkeys: usize,
        proofs: usize,
    },

    #[error("Validator {index} supplied more than once")]
    DuplicateValidatorIndex { index: usize },

    #[error("Message batch is empty")]
    EmptyBatch,

    #[error("Supplied leaf {supplied} does not match leaf {computed} recomputed from the messages")]
    LeafMismatch { computed: String, supplied: String },

    #[error("No MMR root has been finalized yet")]
    NoFinalizedRoot,

    #[error("Message batch is not included in the finalized MMR root: {0}")]
    MessageProofRejected(#[source] ProofError),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ValidatorIndexOutOfRange { .. }
            | BridgeError::InvalidMembershipProof { .. } => ErrorKind::Membership,

            BridgeError::InvalidSignature { .. }
            | BridgeError::MalformedSignature { .. }
            | BridgeError::MissingSignature { .. } => ErrorKind::Signature,

            BridgeError::WaitPeriodNotOver { .. } | BridgeError::SeedUnavailable { .. } => {
                ErrorKind::Timing
            }

            BridgeError::UnknownCommitment { .. }
            | BridgeError::CommitmentExpired { .. }
            | BridgeError::SeedPruned { .. }
            | BridgeError::UnknownChannel(_) => ErrorKind::State,

            BridgeError::NonceMismatch { .. } | BridgeError::NonceOverflow { .. } => {
                ErrorKind::Ordering
            }

            BridgeError::BitfieldLengthMismatch { .. }
            | BridgeError::InvalidClaimBitfield { .. }
            | BridgeError::PayloadHashMismatch { .. }
            | BridgeError::CommitmentHashMismatch { .. }
            | BridgeError::InvalidPayload(_)
            | BridgeError::ValidatorSetMismatch { .. }
            | BridgeError::StaleCommitment { .. }
            | BridgeError::MismatchedProofArrays { .. }
            | BridgeError::DuplicateValidatorIndex { .. }
            | BridgeError::EmptyBatch
            | BridgeError::LeafMismatch { .. }
            | BridgeError::NoFinalizedRoot
            | BridgeError::MessageProofRejected(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_period_message_is_exact() {
        let err = BridgeError::WaitPeriodNotOver {
            created_at: 100,
            current: 140,
            wait_period: 45,
        };
        assert_eq!(err.to_string(), WAIT_PERIOD_NOT_OVER);
        assert_eq!(err.kind(), ErrorKind::Timing);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            BridgeError::UnknownCommitment { id: 3 }.kind(),
            ErrorKind::State
        );
        assert_eq!(
            BridgeError::NonceMismatch {
                channel: ChannelId::Basic,
                expected: 1,
                got: 3
            }
            .kind(),
            ErrorKind::Ordering
        );
        assert_eq!(
            BridgeError::MessageProofRejected(ProofError::EmptyTree).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            BridgeError::NonceOverflow {
                channel: ChannelId::Basic,
                last: u64::MAX
            }
            .kind(),
            ErrorKind::Ordering
        );
        assert_eq!(BridgeError::SeedUnavailable { block: 9 }.kind(), ErrorKind::Timing);
        assert_eq!(BridgeError::SeedPruned { block: 9 }.kind(), ErrorKind::State);
        assert_eq!(ErrorKind::Membership.to_string(), "MembershipError");
    }
}
