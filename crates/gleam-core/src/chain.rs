//! The host chain as seen by the bridge: a block height and the hashes of
//! sealed blocks. Time is measured only in blocks.

use crate::merkle::keccak256;

pub trait HostChain {
    /// Number of the block currently being executed.
    fn block_number(&self) -> u64;

    /// Hash of a sealed block. `None` for the current block, future blocks,
    /// and history the chain no longer serves.
    fn block_hash(&self, number: u64) -> Option<[u8; 32]>;
}

/// Deterministic in-memory chain for running the bridge in isolation.
#[derive(Clone, Debug)]
pub struct InMemoryChain {
    number: u64,
    salt: [u8; 32],
    /// How many recent sealed blocks keep their hashes. `None` keeps all.
    history: Option<u64>,
}

impl InMemoryChain {
    pub fn new(block_number: u64) -> Self {
        Self {
            number: block_number,
            salt: [0u8; 32],
            history: None,
        }
    }

    /// Same heights, different hashes.
    pub fn with_salt(mut self, salt: [u8; 32]) -> Self {
        self.salt = salt;
        self
    }

    /// Serve hashes only for the last `blocks` sealed blocks.
    pub fn with_history(mut self, blocks: u64) -> Self {
        self.history = Some(blocks);
        self
    }

    /// Seal `blocks` blocks.
    pub fn mine(&mut self, blocks: u64) {
        self.number = self.number.saturating_add(blocks);
    }

    pub fn set_block_number(&mut self, number: u64) {
        self.number = number;
    }
}

impl HostChain for InMemoryChain {
    fn block_number(&self) -> u64 {
        self.number
    }

    fn block_hash(&self, number: u64) -> Option<[u8; 32]> {
        if number >= self.number {
            return None;
        }
        if let Some(history) = self.history {
            if self.number - number > history {
                return None;
            }
        }
        let mut data = [0u8; 40];
        data[..32].copy_from_slice(&self.salt);
        data[32..].copy_from_slice(&number.to_be_bytes());
        Some(keccak256(&data))
    }
}
