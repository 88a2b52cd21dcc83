//! The bridge surface relayers and host applications talk to.

use alloy_primitives::Address;
use std::collections::BTreeSet;
use tracing::info;

use crate::chain::HostChain;
use crate::channel::{AppRegistry, Application, InboundDispatcher};
use crate::config::{BridgeConfig, ConfigError};
use crate::consensus::{
    CommitmentProtocol, EcdsaVerifier, InitialClaim, SignatureVerifier, ValidatorSignature,
};
use crate::error::BridgeError;
use crate::merkle::MmrProof;
use crate::state::{BridgeEvent, BridgeState};
use crate::types::{Bitfield, ChannelId, CommitmentStatus, Message, PendingCommitment};

/// A light client of the remote chain living on the host chain `C`.
///
/// Owns the bridge state and the registered applications. Every operation
/// borrows the bridge mutably for its whole duration, so operations are
/// applied one at a time and each is atomic.
#[derive(Debug)]
pub struct LightClientBridge<C, V = EcdsaVerifier> {
    config: BridgeConfig,
    protocol: CommitmentProtocol<V>,
    dispatcher: InboundDispatcher,
    state: BridgeState,
    chain: C,
    apps: AppRegistry,
}

impl<C: HostChain> LightClientBridge<C, EcdsaVerifier> {
    pub fn new(config: BridgeConfig, chain: C) -> Result<Self, ConfigError> {
        Self::with_verifier(config, chain, EcdsaVerifier)
    }
}

impl<C: HostChain, V: SignatureVerifier> LightClientBridge<C, V> {
    pub fn with_verifier(config: BridgeConfig, chain: C, verifier: V) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut state = BridgeState::new();
        for channel in &config.channels {
            state.channel_nonces.insert(channel.id, channel.initial_nonce);
        }

        info!(
            validator_set_id = config.validator_set.id,
            validators = config.validator_set.length,
            wait_period = config.wait_period,
            channels = config.channels.len(),
            "initialized light-client bridge"
        );

        Ok(Self {
            protocol: CommitmentProtocol::from_config(&config, verifier),
            dispatcher: InboundDispatcher::from_config(&config),
            config,
            state,
            chain,
            apps: AppRegistry::new(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    /// Phase one. `signature` is the claimant's signature over
    /// `commitment_hash`; `proof` places `claimant` at `claimant_index`.
    pub fn new_signature_commitment(
        &mut self,
        commitment_hash: [u8; 32],
        bitfield: Bitfield,
        signature: &[u8],
        claimant_index: usize,
        claimant: Address,
        proof: &[[u8; 32]],
    ) -> Result<u64, BridgeError> {
        let claim = InitialClaim {
            commitment_hash,
            bitfield,
            claimant: ValidatorSignature {
                index: claimant_index,
                signer: claimant,
                signature: signature.to_vec(),
                proof: proof.to_vec(),
            },
        };
        self.protocol
            .new_signature_commitment(&mut self.state, &self.chain, &claim)
    }

    /// Phase two, with one entry per co-signer across the parallel arrays.
    #[allow(clippy::too_many_arguments)]
    pub fn complete_signature_commitment(
        &mut self,
        id: u64,
        commitment_hash: [u8; 32],
        payload: &[u8],
        signatures: &[Vec<u8>],
        indices: &[usize],
        pubkeys: &[Address],
        proofs: &[Vec<[u8; 32]>],
    ) -> Result<[u8; 32], BridgeError> {
        let n = signatures.len();
        if indices.len() != n || pubkeys.len() != n || proofs.len() != n {
            return Err(BridgeError::MismatchedProofArrays {
                signatures: n,
                indices: indices.len(),
                pubkeys: pubkeys.len(),
                proofs: proofs.len(),
            });
        }

        let entries: Vec<ValidatorSignature> = signatures
            .iter()
            .zip(indices)
            .zip(pubkeys)
            .zip(proofs)
            .map(|(((signature, &index), &signer), proof)| ValidatorSignature {
                index,
                signer,
                signature: signature.clone(),
                proof: proof.clone(),
            })
            .collect();

        self.complete_with_signatures(id, commitment_hash, payload, &entries)
    }

    pub fn complete_with_signatures(
        &mut self,
        id: u64,
        commitment_hash: [u8; 32],
        payload: &[u8],
        signatures: &[ValidatorSignature],
    ) -> Result<[u8; 32], BridgeError> {
        self.protocol.complete_signature_commitment(
            &mut self.state,
            &self.chain,
            id,
            &commitment_hash,
            payload,
            signatures,
        )
    }

    pub fn validator_bitfield(&self, id: u64) -> Result<Bitfield, BridgeError> {
        self.protocol
            .validator_bitfield(&self.state, &self.chain, id)
    }

    /// Validators the relayer must collect signatures from to complete `id`.
    pub fn required_indices(&self, id: u64) -> Result<BTreeSet<usize>, BridgeError> {
        self.protocol.required_indices(&self.state, &self.chain, id)
    }

    pub fn current_id(&self) -> u64 {
        self.state.current_id()
    }

    pub fn latest_mmr_root(&self) -> [u8; 32] {
        self.state.latest_mmr_root()
    }

    pub fn latest_block_number(&self) -> Option<u64> {
        self.state.latest_block_number()
    }

    pub fn pending_commitment(&self, id: u64) -> Option<&PendingCommitment> {
        self.state.pending_commitment(id)
    }

    pub fn commitment_status(&self, id: u64) -> Option<CommitmentStatus> {
        self.protocol
            .commitment_status(&self.state, &self.chain, id)
    }

    pub fn prune_expired(&mut self) -> Vec<u64> {
        self.protocol.prune_expired(&mut self.state, &self.chain)
    }

    /// Deliver a message batch on `channel`. `proof` proves `leaf` at
    /// `leaf_index` in an MMR of `leaf_count` leaves under the latest root.
    pub fn submit(
        &mut self,
        channel: ChannelId,
        messages: &[Message],
        leaf: [u8; 32],
        leaf_index: u64,
        leaf_count: u64,
        proof: &[[u8; 32]],
    ) -> Result<usize, BridgeError> {
        let proof = MmrProof {
            leaf_index,
            leaf_count,
            items: proof.to_vec(),
        };
        self.dispatcher.submit(
            &mut self.state,
            &mut self.apps,
            channel,
            messages,
            &leaf,
            &proof,
        )
    }

    /// Last nonce delivered on `channel`.
    pub fn channel_nonce(&self, channel: ChannelId) -> u64 {
        self.state.channel_nonce(channel)
    }

    pub fn register_app(&mut self, target: Address, app: impl Application + 'static) {
        if self.apps.register(target, app).is_some() {
            info!(%target, "replaced application");
        }
    }

    pub fn take_events(&mut self) -> Vec<BridgeEvent> {
        self.state.take_events()
    }
}
