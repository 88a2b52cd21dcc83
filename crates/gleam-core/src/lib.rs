//! # Gleam Core
//!
//! Host-side light client of a remote chain, and the inbound message bridge
//! built on top of it.
//!
//! This crate contains **no networking code** and **no async runtime**. It
//! is handed a host chain (block height and block hashes), a bridge config
//! and the calls relayers make, and decides what to accept.
//!
//! ## Trust Model
//!
//! - **Commitments** (`consensus` module): A remote MMR root is accepted in
//!   two phases. One validator claims it; after a wait period, validators
//!   chosen at random by a block hash the claimant could not predict must
//!   co-sign it. Each signer proves membership against the committed
//!   validator-set root.
//!
//! - **Messages** (`channel` module): A batch of messages is delivered only if
//!   its leaf is proven under the latest accepted MMR root, and only in
//!   strict nonce order per channel. Zero trust beyond the accepted root.
//!
//! ## Usage
//!
//! ```ignore
//! use gleam_core::{BridgeConfig, InMemoryChain, LightClientBridge};
//!
//! let config = BridgeConfig::load("bridge.json")?;
//! let mut bridge = LightClientBridge::new(config, InMemoryChain::new(0))?;
//! let id = bridge.new_signature_commitment(hash, bitfield, &sig, index, signer, &proof)?;
//! ```

pub mod bridge;
pub mod chain;
pub mod channel;
pub mod config;
pub mod consensus;
pub mod error;
pub mod merkle;
pub mod state;
pub mod types;

// Re-export commonly used types for convenience
pub use bridge::LightClientBridge;
pub use chain::{HostChain, InMemoryChain};
pub use channel::{AppError, AppRegistry, Application, InboundDispatcher, MessageOrigin};
pub use config::{BridgeConfig, ChannelConfig, ConfigError};
pub use consensus::{
    protocol::{CommitmentProtocol, InitialClaim, ValidatorSignature},
    selector::{selection_seed, RandomValidatorSelector},
    signature::{EcdsaVerifier, SignatureError, SignatureVerifier},
    validator_set::{build_validator_set, validator_leaf, validator_proofs, ValidatorSetRegistry},
};
pub use error::{BridgeError, ErrorKind, WAIT_PERIOD_NOT_OVER};
pub use merkle::{keccak256, MerkleMountainRange, MmrProof, ProofError};
pub use state::{BridgeEvent, BridgeState};
pub use types::*;
