//! Two-phase commitment protocol.
//!
//! Phase one admits a claim signed by a single validator. After the wait
//! period, phase two must add signatures from validators selected at random
//! by data the claimant could not know when it submitted. Only then is the
//! MMR root carried in the commitment published.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::chain::HostChain;
use crate::config::BridgeConfig;
use crate::consensus::selector::{selection_seed, RandomValidatorSelector};
use crate::consensus::signature::{EcdsaVerifier, SignatureVerifier};
use crate::consensus::validator_set::ValidatorSetRegistry;
use crate::error::BridgeError;
use crate::merkle::keccak256;
use crate::state::{BridgeEvent, BridgeState};
use crate::types::{
    Bitfield, Commitment, CommitmentStatus, PendingCommitment, DEFAULT_REQUIRED_SIGNATURES,
    DEFAULT_WAIT_PERIOD,
};

/// One validator's signature together with the proof that it is a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignature {
    pub index: usize,
    pub signer: Address,
    /// `r || s || v`, 65 bytes.
    pub signature: Vec<u8>,
    /// MMR proof of `signer` at `index` under the validator-set root.
    pub proof: Vec<[u8; 32]>,
}

/// Phase-one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialClaim {
    pub commitment_hash: [u8; 32],
    /// Must have exactly the claimant's bit set.
    pub bitfield: Bitfield,
    pub claimant: ValidatorSignature,
}

#[derive(Clone, Debug)]
pub struct CommitmentProtocol<V = EcdsaVerifier> {
    registry: ValidatorSetRegistry,
    verifier: V,
    selector: RandomValidatorSelector,
    wait_period: u64,
    expiry_period: Option<u64>,
}

impl<V: SignatureVerifier> CommitmentProtocol<V> {
    pub fn new(registry: ValidatorSetRegistry, verifier: V) -> Self {
        Self {
            registry,
            verifier,
            selector: RandomValidatorSelector::new(DEFAULT_REQUIRED_SIGNATURES),
            wait_period: DEFAULT_WAIT_PERIOD,
            expiry_period: None,
        }
    }

    pub fn from_config(config: &BridgeConfig, verifier: V) -> Self {
        Self {
            registry: ValidatorSetRegistry::new(config.validator_set.clone()),
            verifier,
            selector: RandomValidatorSelector::new(config.required_signatures),
            wait_period: config.wait_period,
            expiry_period: config.expiry_period,
        }
    }

    pub fn with_wait_period(mut self, blocks: u64) -> Self {
        self.wait_period = blocks;
        self
    }

    pub fn with_required_signatures(mut self, count: usize) -> Self {
        self.selector = RandomValidatorSelector::new(count);
        self
    }

    pub fn with_expiry_period(mut self, blocks: Option<u64>) -> Self {
        self.expiry_period = blocks;
        self
    }

    pub fn registry(&self) -> &ValidatorSetRegistry {
        &self.registry
    }

    pub fn wait_period(&self) -> u64 {
        self.wait_period
    }

    pub fn expiry_period(&self) -> Option<u64> {
        self.expiry_period
    }

    /// Phase one: admit a claim signed by a single member and return its id.
    pub fn new_signature_commitment(
        &self,
        state: &mut BridgeState,
        chain: &impl HostChain,
        claim: &InitialClaim,
    ) -> Result<u64, BridgeError> {
        self.check_claim(claim).inspect_err(|err| {
            debug!(
                claimant = claim.claimant.index,
                kind = %err.kind(),
                %err,
                "rejected signature commitment"
            );
        })?;

        let id = state.next_id;
        let block = chain.block_number();
        state.next_id += 1;
        state.pending.insert(
            id,
            PendingCommitment {
                id,
                commitment_hash: claim.commitment_hash,
                bitfield: claim.bitfield.clone(),
                created_at_block: block,
                claimant_index: claim.claimant.index,
                claimant: claim.claimant.signer,
            },
        );
        state.record(BridgeEvent::InitialVerificationSuccessful {
            id,
            prover: claim.claimant.signer,
            block,
        });

        info!(
            id,
            block,
            prover = %claim.claimant.signer,
            ready_at = block.saturating_add(self.wait_period),
            "admitted signature commitment"
        );
        Ok(id)
    }

    fn check_claim(&self, claim: &InitialClaim) -> Result<(), BridgeError> {
        let length = self.registry.len();
        let index = claim.claimant.index;

        if claim.bitfield.len() != length {
            return Err(BridgeError::BitfieldLengthMismatch {
                expected: length,
                got: claim.bitfield.len(),
            });
        }
        if index >= length {
            return Err(BridgeError::ValidatorIndexOutOfRange { index, length });
        }
        if !claim.bitfield.is_set(index) || claim.bitfield.count_ones() != 1 {
            return Err(BridgeError::InvalidClaimBitfield {
                claimant: index,
                set_bits: claim.bitfield.count_ones(),
            });
        }

        self.verify_validator(&claim.commitment_hash, &claim.claimant)
    }

    /// Bitfield of commitment `id`, available once its wait period is over.
    pub fn validator_bitfield(
        &self,
        state: &BridgeState,
        chain: &impl HostChain,
        id: u64,
    ) -> Result<Bitfield, BridgeError> {
        let pending = self.ready_entry(state, chain, id)?;
        Ok(pending.bitfield.clone())
    }

    /// Validators that must co-sign commitment `id` in phase two.
    pub fn required_indices(
        &self,
        state: &BridgeState,
        chain: &impl HostChain,
        id: u64,
    ) -> Result<BTreeSet<usize>, BridgeError> {
        let pending = self.ready_entry(state, chain, id)?;

        let block = pending.seed_block(self.wait_period);
        let block_hash = chain.block_hash(block).ok_or_else(|| {
            if block < chain.block_number() {
                BridgeError::SeedPruned { block }
            } else {
                BridgeError::SeedUnavailable { block }
            }
        })?;
        let seed = selection_seed(&block_hash, id);

        Ok(self
            .selector
            .required_indices(&seed, &pending.bitfield, self.registry.len()))
    }

    /// Phase two: check the co-signatures and publish the commitment's MMR
    /// root. Returns the root.
    pub fn complete_signature_commitment(
        &self,
        state: &mut BridgeState,
        chain: &impl HostChain,
        id: u64,
        commitment_hash: &[u8; 32],
        payload: &[u8],
        signatures: &[ValidatorSignature],
    ) -> Result<[u8; 32], BridgeError> {
        let commitment = self
            .check_completion(state, chain, id, commitment_hash, payload, signatures)
            .inspect_err(|err| {
                debug!(id, kind = %err.kind(), %err, "rejected commitment completion");
            })?;

        let mmr_root = commitment.mmr_root.0;
        state.pending.remove(&id);
        state.close(id, CommitmentStatus::Finalized);
        state.latest_mmr_root = mmr_root;
        state.latest_block_number = Some(commitment.block_number);
        state.record(BridgeEvent::FinalVerificationSuccessful {
            id,
            mmr_root,
            block_number: commitment.block_number,
        });

        info!(
            id,
            block_number = commitment.block_number,
            mmr_root = %hex::encode(mmr_root),
            signatures = signatures.len(),
            "finalized commitment"
        );
        Ok(mmr_root)
    }

    fn check_completion(
        &self,
        state: &BridgeState,
        chain: &impl HostChain,
        id: u64,
        commitment_hash: &[u8; 32],
        payload: &[u8],
        signatures: &[ValidatorSignature],
    ) -> Result<Commitment, BridgeError> {
        // 1. The claim must exist, be live, and be past its wait period
        let pending = self.ready_entry(state, chain, id)?;

        // 2. Payload, supplied hash and admitted hash must all agree
        let computed = keccak256(payload);
        if computed != *commitment_hash {
            return Err(BridgeError::PayloadHashMismatch {
                computed: format!("0x{}", hex::encode(computed)),
                claimed: format!("0x{}", hex::encode(commitment_hash)),
            });
        }
        if pending.commitment_hash != *commitment_hash {
            return Err(BridgeError::CommitmentHashMismatch { id });
        }

        let commitment = Commitment::decode_payload(payload)?;
        if commitment.validator_set_id != self.registry.id() {
            return Err(BridgeError::ValidatorSetMismatch {
                expected: self.registry.id(),
                got: commitment.validator_set_id,
            });
        }
        if let Some(latest) = state.latest_block_number {
            if commitment.block_number <= latest {
                return Err(BridgeError::StaleCommitment {
                    block_number: commitment.block_number,
                    latest,
                });
            }
        }

        // 3. Every supplied signature must come from a proven member
        let mut supplied = BTreeSet::new();
        for entry in signatures {
            if !supplied.insert(entry.index) {
                return Err(BridgeError::DuplicateValidatorIndex { index: entry.index });
            }
        }
        let required = self.required_indices(state, chain, id)?;
        for entry in signatures {
            self.verify_validator(&pending.commitment_hash, entry)?;
        }

        // 4. Every randomly selected co-signer must be among them
        if let Some(&index) = required.difference(&supplied).next() {
            return Err(BridgeError::MissingSignature { index });
        }

        Ok(commitment)
    }

    /// Where commitment `id` is in its lifecycle. `None` for ids never
    /// issued and for closed ids older than the state's closed history.
    pub fn commitment_status(
        &self,
        state: &BridgeState,
        chain: &impl HostChain,
        id: u64,
    ) -> Option<CommitmentStatus> {
        if let Some(pending) = state.pending.get(&id) {
            return Some(if pending.is_expired(chain.block_number(), self.expiry_period) {
                CommitmentStatus::Expired
            } else {
                CommitmentStatus::Open
            });
        }
        state.closed_status(id)
    }

    /// Drop every expired pending commitment and return the ids dropped.
    pub fn prune_expired(&self, state: &mut BridgeState, chain: &impl HostChain) -> Vec<u64> {
        let current = chain.block_number();
        let expired: Vec<u64> = state
            .pending
            .values()
            .filter(|pending| pending.is_expired(current, self.expiry_period))
            .map(|pending| pending.id)
            .collect();

        for &id in &expired {
            state.pending.remove(&id);
            state.close(id, CommitmentStatus::Expired);
            state.record(BridgeEvent::CommitmentExpired { id });
        }
        if !expired.is_empty() {
            info!(count = expired.len(), block = current, "pruned expired commitments");
        }
        expired
    }

    /// Look up commitment `id` and check it may be acted on at the current block.
    fn ready_entry<'a>(
        &self,
        state: &'a BridgeState,
        chain: &impl HostChain,
        id: u64,
    ) -> Result<&'a PendingCommitment, BridgeError> {
        let pending = state
            .pending
            .get(&id)
            .ok_or(BridgeError::UnknownCommitment { id })?;
        let current = chain.block_number();

        if let Some(expired_at) = pending.expires_at(self.expiry_period) {
            if current >= expired_at {
                return Err(BridgeError::CommitmentExpired { id, expired_at });
            }
        }
        if current < pending.ready_at(self.wait_period) {
            return Err(BridgeError::WaitPeriodNotOver {
                created_at: pending.created_at_block,
                current,
                wait_period: self.wait_period,
            });
        }
        Ok(pending)
    }

    fn verify_validator(
        &self,
        commitment_hash: &[u8; 32],
        entry: &ValidatorSignature,
    ) -> Result<(), BridgeError> {
        self.registry
            .check_member(&entry.signer, entry.index, &entry.proof)?;

        match self
            .verifier
            .check(commitment_hash, &entry.signature, &entry.signer)
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(BridgeError::InvalidSignature { index: entry.index }),
            Err(source) => Err(BridgeError::MalformedSignature {
                index: entry.index,
                source,
            }),
        }
    }
}
