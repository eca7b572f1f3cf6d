//! Error types for the btleplug adapter

use blebridge_core::AdapterError;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the btleplug adapter
#[derive(Error, Debug)]
pub enum BleAdapterError {
    #[error("Failed to create BLE manager: {0}")]
    ManagerFailed(String),

    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Event stream already taken")]
    EventStreamTaken,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Peripheral not discovered: {0}")]
    PeripheralNotDiscovered(String),

    #[error("Characteristic not found: {characteristic}")]
    CharacteristicNotFound { characteristic: String },

    #[error("Unsupported descriptor: {descriptor}")]
    UnsupportedDescriptor { descriptor: String },

    #[error("Failed to get notifications stream: {0}")]
    NotificationStreamFailed(String),

    #[error(transparent)]
    Btleplug(#[from] btleplug::Error),
}

impl From<BleAdapterError> for AdapterError {
    fn from(err: BleAdapterError) -> Self {
        match err {
            BleAdapterError::AdapterNotAvailable => AdapterError::Unavailable,
            BleAdapterError::UnknownConnection(handle) => AdapterError::NotFound(handle),
            BleAdapterError::PeripheralNotDiscovered(id) => AdapterError::NotFound(id),
            BleAdapterError::Btleplug(btleplug::Error::NotConnected) => AdapterError::LinkLost,
            BleAdapterError::Btleplug(btleplug::Error::DeviceNotFound) => {
                AdapterError::NotFound("device".to_string())
            }
            other => AdapterError::Platform(other.to_string()),
        }
    }
}

pub type BleAdapterResult<T> = Result<T, BleAdapterError>;
