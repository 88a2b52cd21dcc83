use alloy_primitives::{Address, Bytes};
use alloy_rlp::{Encodable, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::merkle::keccak256;

/// Inbound message paths from the remote chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    /// Plain delivery, no relayer incentives.
    Basic,
    /// Delivery paid for on the remote side.
    Incentivized,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Basic, ChannelId::Incentivized];

    /// Tag bound into message leaves.
    pub fn as_u8(self) -> u8 {
        match self {
            ChannelId::Basic => 0,
            ChannelId::Incentivized => 1,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Basic => f.write_str("basic"),
            ChannelId::Incentivized => f.write_str("incentivized"),
        }
    }
}

/// A message committed on the remote chain for a host-side application.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable, RlpDecodable, Serialize, Deserialize)]
pub struct Message {
    /// Application the payload is delivered to.
    pub target: Address,
    /// Position in the channel's sequence; the only replay guard.
    pub nonce: u64,
    /// Opaque to the bridge, interpreted by the target.
    pub payload: Bytes,
}

/// Canonical form of a batch: the channel tag and the remote source address
/// are bound in so a batch cannot be executed on another channel.
#[derive(RlpEncodable)]
struct MessageBundle {
    channel: u8,
    source: Address,
    messages: Vec<Message>,
}

/// Recompute the MMR leaf committing to `messages` on `channel`.
pub fn compute_message_leaf(channel: ChannelId, source: Address, messages: &[Message]) -> [u8; 32] {
    let bundle = MessageBundle {
        channel: channel.as_u8(),
        source,
        messages: messages.to_vec(),
    };
    let mut out = Vec::with_capacity(bundle.length());
    bundle.encode(&mut out);
    keccak256(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(nonce: u64) -> Message {
        Message {
            target: Address::repeat_byte(0x42),
            nonce,
            payload: Bytes::from(vec![0xde, 0xad, nonce as u8]),
        }
    }

    #[test]
    fn test_leaf_is_deterministic() {
        let source = Address::repeat_byte(0x01);
        let batch = vec![message(1), message(2)];
        assert_eq!(
            compute_message_leaf(ChannelId::Basic, source, &batch),
            compute_message_leaf(ChannelId::Basic, source, &batch.clone())
        );
    }

    #[test]
    fn test_leaf_binds_channel_source_and_order() {
        let source = Address::repeat_byte(0x01);
        let batch = vec![message(1), message(2)];
        let leaf = compute_message_leaf(ChannelId::Basic, source, &batch);

        assert_ne!(leaf, compute_message_leaf(ChannelId::Incentivized, source, &batch));
        assert_ne!(
            leaf,
            compute_message_leaf(ChannelId::Basic, Address::repeat_byte(0x02), &batch)
        );
        let reversed = vec![message(2), message(1)];
        assert_ne!(leaf, compute_message_leaf(ChannelId::Basic, source, &reversed));
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(ChannelId::Basic.to_string(), "basic");
        assert_eq!(ChannelId::Incentivized.to_string(), "incentivized");
    }
}
