//! ValueChannel: I/O on the resolved characteristic
//!
//! Holds the connection-scoped characteristic handle and the last known value.
//! A write never touches the sample; only reads and notifications do.

use crate::codec::{decode_value, encode_value, parse_input};
use crate::errors::{BridgeError, DecodeError};
use crate::handles::CharacteristicHandle;
use crate::messages::Effect;

#[derive(Debug, Default, Clone)]
pub struct ValueChannel {
    characteristic: Option<CharacteristicHandle>,
    sample: Option<u32>,
}

impl ValueChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn characteristic(&self) -> Option<&CharacteristicHandle> {
        self.characteristic.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.characteristic.is_some()
    }

    /// Last known remote value
    pub fn sample(&self) -> Option<u32> {
        self.sample
    }

    /// Attach a freshly resolved characteristic
    pub fn bind(&mut self, characteristic: CharacteristicHandle) {
        self.characteristic = Some(characteristic);
    }

    /// Drop the handle and the sample
    pub fn clear(&mut self) {
        self.characteristic = None;
        self.sample = None;
    }

    /// Check that a completion belongs to the bound characteristic
    pub fn owns(&self, characteristic: &CharacteristicHandle) -> bool {
        self.characteristic.as_ref() == Some(characteristic)
    }

    /// Issue a read
    pub fn read(&self) -> Result<Effect, BridgeError> {
        let characteristic = self
            .characteristic
            .clone()
            .ok_or(BridgeError::NotConnected)?;
        Ok(Effect::ReadCharacteristic { characteristic })
    }

    /// Parse `text` and issue a write
    ///
    /// The input is validated before the connection is checked, and no I/O
    /// happens for invalid input.
    pub fn write(&self, text: &str) -> Result<Effect, BridgeError> {
        let value = parse_input(text)?;
        let characteristic = self
            .characteristic
            .clone()
            .ok_or(BridgeError::NotConnected)?;
        Ok(Effect::WriteCharacteristic {
            characteristic,
            value,
            payload: encode_value(value),
        })
    }

    /// Apply a read or notification payload
    ///
    /// A decode failure leaves the sample untouched.
    pub fn accept(&mut self, payload: &[u8]) -> Result<u32, DecodeError> {
        let value = decode_value(payload)?;
        self.sample = Some(value);
        Ok(value)
    }
}
