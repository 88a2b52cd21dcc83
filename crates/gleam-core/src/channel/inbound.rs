use alloy_primitives::Address;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::channel::app::{AppRegistry, MessageOrigin};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::merkle::{check_inclusion, MmrProof};
use crate::state::{BridgeEvent, BridgeState};
use crate::types::{compute_message_leaf, ChannelId, Message};

/// Accepts message batches proven against the finalized MMR root and
/// delivers them in nonce order.
#[derive(Clone, Debug, Default)]
pub struct InboundDispatcher {
    sources: BTreeMap<ChannelId, Address>,
}

impl InboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            sources: config
                .channels
                .iter()
                .map(|channel| (channel.id, channel.source))
                .collect(),
        }
    }

    pub fn with_channel(mut self, channel: ChannelId, source: Address) -> Self {
        self.sources.insert(channel, source);
        self
    }

    /// Remote outbound channel `channel` accepts batches from.
    pub fn source(&self, channel: ChannelId) -> Option<Address> {
        self.sources.get(&channel).copied()
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.sources.keys().copied()
    }

    /// Verify a batch and deliver every message in it. Returns the number
    /// of messages delivered.
    ///
    /// Either the whole batch is delivered or nothing changes. Once delivery
    /// starts, each message's nonce is consumed before its target runs, and a
    /// failing target is only recorded.
    pub fn submit(
        &self,
        state: &mut BridgeState,
        apps: &mut AppRegistry,
        channel: ChannelId,
        messages: &[Message],
        leaf: &[u8; 32],
        proof: &MmrProof,
    ) -> Result<usize, BridgeError> {
        let source = self
            .check_batch(state, channel, messages, leaf, proof)
            .inspect_err(|err| {
                debug!(%channel, kind = %err.kind(), %err, "rejected message batch");
            })?;
        let origin = MessageOrigin { channel, source };

        for message in messages {
            state.channel_nonces.insert(channel, message.nonce);

            let success = match apps.get_mut(&message.target) {
                Some(app) => match app.handle(&origin, &message.payload) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(
                            %channel,
                            nonce = message.nonce,
                            target = %message.target,
                            %err,
                            "message handler failed"
                        );
                        false
                    }
                },
                None => {
                    warn!(
                        %channel,
                        nonce = message.nonce,
                        target = %message.target,
                        "no application registered for message target"
                    );
                    false
                }
            };

            state.record(BridgeEvent::MessageDispatched {
                channel,
                nonce: message.nonce,
                target: message.target,
                success,
            });
        }

        info!(
            %channel,
            count = messages.len(),
            nonce = state.channel_nonce(channel),
            "dispatched message batch"
        );
        Ok(messages.len())
    }

    fn check_batch(
        &self,
        state: &BridgeState,
        channel: ChannelId,
        messages: &[Message],
        leaf: &[u8; 32],
        proof: &MmrProof,
    ) -> Result<Address, BridgeError> {
        let source = self
            .source(channel)
            .ok_or(BridgeError::UnknownChannel(channel))?;
        if messages.is_empty() {
            return Err(BridgeError::EmptyBatch);
        }

        // 1. The leaf must commit to exactly these messages on this channel
        let computed = compute_message_leaf(channel, source, messages);
        if computed != *leaf {
            return Err(BridgeError::LeafMismatch {
                computed: format!("0x{}", hex::encode(computed)),
                supplied: format!("0x{}", hex::encode(leaf)),
            });
        }

        // 2. ...and be included under the finalized root
        if !state.has_finalized_root() {
            return Err(BridgeError::NoFinalizedRoot);
        }
        check_inclusion(
            leaf,
            proof.leaf_index,
            proof.leaf_count,
            &proof.items,
            &state.latest_mmr_root,
        )
        .map_err(BridgeError::MessageProofRejected)?;

        // 3. Nonces must continue the channel's sequence without gaps
        let mut last = state.channel_nonce(channel);
        for message in messages {
            let expected = last
                .checked_add(1)
                .ok_or(BridgeError::NonceOverflow { channel, last })?;
            if message.nonce != expected {
                return Err(BridgeError::NonceMismatch {
                    channel,
                    expected,
                    got: message.nonce,
                });
            }
            last = expected;
        }

        Ok(source)
    }
}
