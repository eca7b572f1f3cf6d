//! Error types for the BLE bridge
//!
//! Every failure the bridge can hit ends up as a status line in the snapshot,
//! so the `Display` text of [`BridgeError`] is the exact text a user sees.

use std::fmt;

use thiserror::Error;

// ----------------------------------------------------------------------------
// Codec Errors
// ----------------------------------------------------------------------------

/// User input that does not satisfy the write grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid number")]
    Empty,

    #[error("Invalid number")]
    Malformed { input: String },

    #[error("Invalid number")]
    OutOfRange { input: String },
}

/// Payload that cannot be decoded as a little-endian u32
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Received string: {text}")]
    ShortText { text: String },

    #[error("Received {len} bytes")]
    TooShort { len: usize },
}

// ----------------------------------------------------------------------------
// Adapter Errors
// ----------------------------------------------------------------------------

/// Errors reported by a platform `BleAdapter`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("BLE adapter not available")]
    Unavailable,

    #[error("could not be started: {0}")]
    NotStarted(String),

    #[error("link lost")]
    LinkLost,

    #[error("unknown handle: {0}")]
    NotFound(String),

    #[error("{0}")]
    Platform(String),
}

impl AdapterError {
    /// Whether the error means the link is gone and the connection is unusable
    pub fn is_link_lost(&self) -> bool {
        matches!(self, AdapterError::LinkLost)
    }
}

// ----------------------------------------------------------------------------
// Bridge Errors
// ----------------------------------------------------------------------------

/// GATT operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    EnableNotify,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOperation::Read => write!(f, "Read"),
            IoOperation::Write => write!(f, "Write"),
            IoOperation::EnableNotify => write!(f, "Enable notify"),
        }
    }
}

/// Failures surfaced to the user through the status line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bluetooth permissions are required")]
    CapabilityDenied,

    #[error("Scan ended, no device found")]
    ScanTimeout,

    #[error("Scan failed: {code}")]
    ScanFailure { code: String },

    #[error("Connection error: {reason}")]
    ConnectionError { reason: String },

    #[error("Characteristic not found")]
    DiscoveryNotFound,

    #[error("Service discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{operation} failed ({reason})")]
    IoFailure {
        operation: IoOperation,
        reason: String,
    },

    #[error("Not connected")]
    NotConnected,
}

impl BridgeError {
    /// Build an I/O failure from an adapter error
    pub fn io(operation: IoOperation, err: &AdapterError) -> Self {
        BridgeError::IoFailure {
            operation,
            reason: err.to_string(),
        }
    }
}
