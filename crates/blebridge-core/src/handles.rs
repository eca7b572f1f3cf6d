//! Opaque handles to remote objects
//!
//! Adapters mint these; the state machine only stores and compares them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Peripheral
// ----------------------------------------------------------------------------

/// A peripheral seen in an advertisement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeripheralHandle {
    id: String,
    name: Option<String>,
}

impl PeripheralHandle {
    /// Create a handle from the platform identifier and advertised local name
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }

    /// Platform identifier (address or OS-assigned id)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advertised local name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

// ----------------------------------------------------------------------------
// Connection-scoped handles
// ----------------------------------------------------------------------------

/// A live GATT-equivalent link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A service found on a connected peripheral
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceHandle {
    pub connection: ConnectionHandle,
    pub uuid: Uuid,
}

/// A characteristic resolved on a connected peripheral
///
/// Only valid while `connection` is alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacteristicHandle {
    pub connection: ConnectionHandle,
    pub service: Uuid,
    pub uuid: Uuid,
}

impl CharacteristicHandle {
    pub fn new(service: &ServiceHandle, uuid: Uuid) -> Self {
        Self {
            connection: service.connection,
            service: service.uuid,
            uuid,
        }
    }
}
