use alloy_primitives::Address;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::types::ChannelId;

/// A target's own verdict on a delivered message. Never unwinds the bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Payload could not be decoded: {0}")]
    Malformed(String),

    #[error("Message rejected by target: {0}")]
    Rejected(String),
}

/// Who a delivered message comes from: the inbound channel and the remote
/// outbound channel that committed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageOrigin {
    pub channel: ChannelId,
    pub source: Address,
}

impl fmt::Display for MessageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.source)
    }
}

/// A host-side application messages can be addressed to.
///
/// Handlers get no access to bridge state, so they cannot re-enter the
/// dispatcher while a batch is being applied.
pub trait Application {
    fn handle(&mut self, origin: &MessageOrigin, payload: &[u8]) -> Result<(), AppError>;
}

impl<F> Application for F
where
    F: FnMut(&MessageOrigin, &[u8]) -> Result<(), AppError>,
{
    fn handle(&mut self, origin: &MessageOrigin, payload: &[u8]) -> Result<(), AppError> {
        self(origin, payload)
    }
}

/// Applications keyed by the address messages target.
#[derive(Default)]
pub struct AppRegistry {
    apps: HashMap<Address, Box<dyn Application>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `app` at `address`, returning whatever was registered there.
    pub fn register(
        &mut self,
        address: Address,
        app: impl Application + 'static,
    ) -> Option<Box<dyn Application>> {
        self.apps.insert(address, Box::new(app))
    }

    pub fn deregister(&mut self, address: &Address) -> Option<Box<dyn Application>> {
        self.apps.remove(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.apps.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub(crate) fn get_mut(&mut self, address: &Address) -> Option<&mut (dyn Application + 'static)> {
        self.apps.get_mut(address).map(|app| app.as_mut())
    }
}

impl fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRegistry")
            .field("targets", &self.apps.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> MessageOrigin {
        MessageOrigin {
            channel: ChannelId::Basic,
            source: Address::repeat_byte(0x01),
        }
    }

    #[test]
    fn test_closure_application() {
        let mut registry = AppRegistry::new();
        let target = Address::repeat_byte(0x42);
        registry.register(target, |_: &MessageOrigin, payload: &[u8]| {
            if payload.is_empty() {
                Err(AppError::Malformed("empty".into()))
            } else {
                Ok(())
            }
        });

        let app = registry.get_mut(&target).unwrap();
        assert!(app.handle(&origin(), b"ok").is_ok());
        assert_eq!(
            app.handle(&origin(), b""),
            Err(AppError::Malformed("empty".into()))
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AppRegistry::new();
        let target = Address::repeat_byte(0x42);
        let noop = |_: &MessageOrigin, _: &[u8]| Ok::<(), AppError>(());
        assert!(registry.register(target, noop).is_none());
        assert!(registry.register(target, noop).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.deregister(&target).is_some());
        assert!(!registry.contains(&target));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(
            origin().to_string(),
            "basic:0x0101010101010101010101010101010101010101"
        );
    }
}
