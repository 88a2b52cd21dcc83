//! The bridge's durable state.
//!
//! Everything the protocol mutates lives in [`BridgeState`], which is passed
//! by reference into each operation. An operation either applies all of its
//! writes or none of them.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ChannelId, CommitmentStatus, PendingCommitment};

/// How many closed (finalized or pruned) commitment ids are remembered for
/// status queries. Older ids are only in the event journal.
pub const CLOSED_HISTORY: usize = 1024;

/// Notable state transitions, in the order they happened.
/// Relayers drain these to learn what to do next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeEvent {
    /// A claim was admitted as pending commitment `id`.
    InitialVerificationSuccessful {
        id: u64,
        prover: Address,
        block: u64,
    },
    /// Commitment `id` completed and its MMR root was published.
    FinalVerificationSuccessful {
        id: u64,
        #[serde(with = "crate::types::hex_hash")]
        mmr_root: [u8; 32],
        block_number: u64,
    },
    /// A message was delivered; `success` is the target's own verdict.
    MessageDispatched {
        channel: ChannelId,
        nonce: u64,
        target: Address,
        success: bool,
    },
    /// An uncompleted commitment was pruned after its expiry.
    CommitmentExpired { id: u64 },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BridgeState {
    pub(crate) pending: BTreeMap<u64, PendingCommitment>,
    pub(crate) next_id: u64,
    /// Outcome of the most recently closed commitments, at most
    /// [`CLOSED_HISTORY`] of them.
    #[serde(default)]
    pub(crate) closed: BTreeMap<u64, CommitmentStatus>,
    #[serde(with = "crate::types::hex_hash")]
    pub(crate) latest_mmr_root: [u8; 32],
    /// Remote block number of the last finalized commitment.
    pub(crate) latest_block_number: Option<u64>,
    /// Last delivered nonce per channel.
    pub(crate) channel_nonces: BTreeMap<ChannelId, u64>,
    pub(crate) events: Vec<BridgeEvent>,
}

impl BridgeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next admitted commitment will get.
    pub fn current_id(&self) -> u64 {
        self.next_id
    }

    /// All-zero until the first commitment is finalized.
    pub fn latest_mmr_root(&self) -> [u8; 32] {
        self.latest_mmr_root
    }

    pub fn latest_block_number(&self) -> Option<u64> {
        self.latest_block_number
    }

    pub fn has_finalized_root(&self) -> bool {
        self.latest_block_number.is_some()
    }

    pub fn pending_commitment(&self, id: u64) -> Option<&PendingCommitment> {
        self.pending.get(&id)
    }

    /// How commitment `id` was closed, if it is still within the history.
    pub fn closed_status(&self, id: u64) -> Option<CommitmentStatus> {
        self.closed.get(&id).copied()
    }

    pub(crate) fn close(&mut self, id: u64, status: CommitmentStatus) {
        self.closed.insert(id, status);
        while self.closed.len() > CLOSED_HISTORY {
            self.closed.pop_first();
        }
    }

    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending.keys().copied().collect()
    }

    /// Last nonce delivered on `channel`; 0 before any delivery.
    pub fn channel_nonce(&self, channel: ChannelId) -> u64 {
        self.channel_nonces.get(&channel).copied().unwrap_or(0)
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn record(&mut self, event: BridgeEvent) {
        self.events.push(event);
    }
}
