use alloy_primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::types::{ChannelId, ValidatorSet, DEFAULT_REQUIRED_SIGNATURES, DEFAULT_WAIT_PERIOD};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Wait period must be at least one block")]
    ZeroWaitPeriod,

    #[error("Validator set must not be empty")]
    EmptyValidatorSet,

    #[error("At least one random co-signer must be required")]
    ZeroRequiredSignatures,

    #[error("Expiry period {expiry} must be longer than the wait period {wait}")]
    ExpiryTooShort { expiry: u64, wait: u64 },

    #[error("Channel {0} is configured more than once")]
    DuplicateChannel(ChannelId),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One inbound channel and the remote outbound channel it accepts batches from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    /// Address of the remote outbound channel, bound into every message leaf.
    pub source: Address,
    /// Last nonce already delivered, for channels migrated mid-sequence.
    #[serde(default)]
    pub initial_nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Blocks a pending commitment waits before it may be completed.
    #[serde(default = "default_wait_period")]
    pub wait_period: u64,
    /// Random co-signers required on top of the claimant.
    #[serde(default = "default_required_signatures")]
    pub required_signatures: usize,
    /// Blocks after creation at which an uncompleted commitment expires.
    /// `None` keeps pending commitments open forever.
    #[serde(default)]
    pub expiry_period: Option<u64>,
    pub validator_set: ValidatorSet,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn default_wait_period() -> u64 {
    DEFAULT_WAIT_PERIOD
}

fn default_required_signatures() -> usize {
    DEFAULT_REQUIRED_SIGNATURES
}

impl BridgeConfig {
    pub fn new(validator_set: ValidatorSet) -> Self {
        Self {
            wait_period: DEFAULT_WAIT_PERIOD,
            required_signatures: DEFAULT_REQUIRED_SIGNATURES,
            expiry_period: None,
            validator_set,
            channels: Vec::new(),
        }
    }

    pub fn with_wait_period(mut self, blocks: u64) -> Self {
        self.wait_period = blocks;
        self
    }

    pub fn with_required_signatures(mut self, count: usize) -> Self {
        self.required_signatures = count;
        self
    }

    pub fn with_expiry_period(mut self, blocks: u64) -> Self {
        self.expiry_period = Some(blocks);
        self
    }

    pub fn with_channel(mut self, id: ChannelId, source: Address) -> Self {
        self.channels.push(ChannelConfig {
            id,
            source,
            initial_nonce: 0,
        });
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_period == 0 {
            return Err(ConfigError::ZeroWaitPeriod);
        }
        if self.validator_set.length == 0 {
            return Err(ConfigError::EmptyValidatorSet);
        }
        if self.required_signatures == 0 {
            return Err(ConfigError::ZeroRequiredSignatures);
        }
        if let Some(expiry) = self.expiry_period {
            if expiry <= self.wait_period {
                return Err(ConfigError::ExpiryTooShort {
                    expiry,
                    wait: self.wait_period,
                });
            }
        }

        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id) {
                return Err(ConfigError::DuplicateChannel(channel.id));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading bridge config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("loading bridge config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_JSON: &str = r#"{
        "wait_period": 45,
        "validator_set": {
            "id": 0,
            "root": "0x697ea2a8fe5b03468548a7a413424a6292ab44a82a6f5cc594c3fa7dda7ce402",
            "length": 2
        },
        "channels": [
            { "id": "basic", "source": "0xb1185ede04202fe62d38f5db72f71e38ff3e8305" },
            { "id": "incentivized", "source": "0x8cf6147918a5cbb672703f879f385036f8793a24", "initial_nonce": 4 }
        ]
    }"#;

    fn validator_set() -> ValidatorSet {
        ValidatorSet {
            id: 0,
            root: [0x11; 32],
            length: 4,
        }
    }

    #[test]
    fn test_parse_json_config() {
        let config = BridgeConfig::from_json_str(CONFIG_JSON).unwrap();
        assert_eq!(config.wait_period, 45);
        assert_eq!(config.required_signatures, DEFAULT_REQUIRED_SIGNATURES);
        assert_eq!(config.expiry_period, None);
        assert_eq!(config.validator_set.length, 2);
        assert_eq!(config.validator_set.root[0], 0x69);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].id, ChannelId::Incentivized);
        assert_eq!(config.channels[1].initial_nonce, 4);
        assert_eq!(config.channels[0].initial_nonce, 0);
    }

    #[test]
    fn test_defaults_validate() {
        let config = BridgeConfig::new(validator_set());
        assert_eq!(config.wait_period, DEFAULT_WAIT_PERIOD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            BridgeConfig::new(validator_set()).with_wait_period(0).validate(),
            Err(ConfigError::ZeroWaitPeriod)
        ));
        assert!(matches!(
            BridgeConfig::new(validator_set())
                .with_required_signatures(0)
                .validate(),
            Err(ConfigError::ZeroRequiredSignatures)
        ));
        assert!(matches!(
            BridgeConfig::new(validator_set())
                .with_wait_period(10)
                .with_expiry_period(10)
                .validate(),
            Err(ConfigError::ExpiryTooShort { expiry: 10, wait: 10 })
        ));

        let mut empty = validator_set();
        empty.length = 0;
        assert!(matches!(
            BridgeConfig::new(empty).validate(),
            Err(ConfigError::EmptyValidatorSet)
        ));
    }

    #[test]
    fn test_rejects_duplicate_channels() {
        let config = BridgeConfig::new(validator_set())
            .with_channel(ChannelId::Basic, Address::repeat_byte(1))
            .with_channel(ChannelId::Basic, Address::repeat_byte(2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateChannel(ChannelId::Basic))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            BridgeConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
