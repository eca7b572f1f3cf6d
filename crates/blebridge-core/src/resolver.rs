//! Service and characteristic resolution
//!
//! The lookup itself is asynchronous and runs in the runtime; this module holds
//! the request and what a result means for the machine.

use crate::errors::{AdapterError, BridgeError};
use crate::handles::{CharacteristicHandle, ConnectionHandle};
use crate::messages::Effect;
use crate::protocol::{
    CLIENT_CHARACTERISTIC_CONFIG_UUID, VALUE_CHARACTERISTIC_UUID, VALUE_SERVICE_UUID,
};

/// Outcome of looking up the value characteristic on a fresh link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(CharacteristicHandle),
    ServiceMissing,
    CharacteristicMissing,
    Failed(AdapterError),
}

/// Request resolution of the fixed service and characteristic
pub fn request(connection: ConnectionHandle) -> Effect {
    Effect::ResolveService {
        connection,
        service: VALUE_SERVICE_UUID,
        characteristic: VALUE_CHARACTERISTIC_UUID,
    }
}

/// Interpret a resolution
///
/// On success the characteristic is subscribed and read once, so the first
/// value shows up without user action.
pub fn complete(resolution: Resolution) -> Result<(CharacteristicHandle, Vec<Effect>), BridgeError> {
    match resolution {
        Resolution::Found(characteristic) => {
            let effects = vec![
                Effect::EnableNotifications {
                    characteristic: characteristic.clone(),
                    descriptor: CLIENT_CHARACTERISTIC_CONFIG_UUID,
                },
                Effect::ReadCharacteristic {
                    characteristic: characteristic.clone(),
                },
            ];
            Ok((characteristic, effects))
        }
        Resolution::ServiceMissing | Resolution::CharacteristicMissing => {
            Err(BridgeError::DiscoveryNotFound)
        }
        Resolution::Failed(err) => Err(BridgeError::DiscoveryFailed {
            reason: err.to_string(),
        }),
    }
}
