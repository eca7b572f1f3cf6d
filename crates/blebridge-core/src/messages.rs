//! Channel message types
//!
//! All traffic into and out of the state machine is one of these:
//! - [`Command`]: front-end to client
//! - [`Event`]: adapter completions, unsolicited adapter events and timer expiry
//! - [`Effect`]: what the machine asks the executor to do

use std::time::Duration;

use uuid::Uuid;

use crate::adapter::AdapterEvent;
use crate::errors::AdapterError;
use crate::handles::{CharacteristicHandle, ConnectionHandle, PeripheralHandle};
use crate::protocol::VALUE_PAYLOAD_LEN;
use crate::resolver::Resolution;

// ----------------------------------------------------------------------------
// Command: Front-end → Client
// ----------------------------------------------------------------------------

/// User-initiated operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scan for the peripheral and connect to the first match
    StartScan,
    /// Stop everything and release all handles
    Disconnect,
    /// Read the characteristic
    ReadValue,
    /// Parse `text` and write it
    WriteValue { text: String },
    /// Write the pending input text
    WriteInput,
    /// Replace the pending input text
    SetInput { text: String },
    /// The front-end could not obtain Bluetooth permissions
    PermissionsDenied,
    /// Tear down and stop the client task
    Shutdown,
}

// ----------------------------------------------------------------------------
// Event: Adapter / Timer → State Machine
// ----------------------------------------------------------------------------

/// Everything that can advance the state machine besides a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A qualifying advertisement was observed
    ScanResult { peripheral: PeripheralHandle },
    /// The scanner reported an error
    ScanFailed { code: String },
    /// The scan window for generation `scan` elapsed
    ScanTimedOut { scan: u64 },
    /// Connect attempt `attempt` brought the link up
    LinkEstablished {
        attempt: u64,
        connection: ConnectionHandle,
    },
    /// Connect attempt `attempt` failed
    LinkFailed { attempt: u64, reason: String },
    /// A link went down
    LinkLost {
        connection: ConnectionHandle,
        reason: Option<String>,
    },
    /// Service and characteristic lookup finished
    ServicesResolved {
        connection: ConnectionHandle,
        resolution: Resolution,
    },
    /// CCCD write finished
    NotificationsEnabled {
        characteristic: CharacteristicHandle,
        result: Result<(), AdapterError>,
    },
    /// Read finished
    CharacteristicRead {
        characteristic: CharacteristicHandle,
        result: Result<Vec<u8>, AdapterError>,
    },
    /// Notification received
    CharacteristicChanged {
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    /// Write finished
    WriteCompleted {
        characteristic: CharacteristicHandle,
        value: u32,
        result: Result<(), AdapterError>,
    },
    /// Radio power changed
    AdapterPowered { powered: bool },
}

impl From<AdapterEvent> for Event {
    fn from(event: AdapterEvent) -> Self {
        match event {
            AdapterEvent::Discovered(peripheral) => Event::ScanResult { peripheral },
            AdapterEvent::ScanFailed { code } => Event::ScanFailed { code },
            AdapterEvent::Disconnected { connection, reason } => {
                Event::LinkLost { connection, reason }
            }
            AdapterEvent::ValueChanged {
                characteristic,
                value,
            } => Event::CharacteristicChanged {
                characteristic,
                value,
            },
            AdapterEvent::PoweredChanged { powered } => Event::AdapterPowered { powered },
        }
    }
}

// ----------------------------------------------------------------------------
// Effect: State Machine → Executor
// ----------------------------------------------------------------------------

/// Side effects requested by a transition, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a filtered scan
    StartScan { service: Uuid },
    /// Stop the active scan
    StopScan,
    /// Fire `ScanTimedOut { scan }` after `after`
    ArmScanTimeout { scan: u64, after: Duration },
    /// Disarm the pending scan timer
    CancelScanTimeout,
    /// Open a link; report `LinkEstablished`/`LinkFailed` tagged with `attempt`
    Connect {
        attempt: u64,
        peripheral: PeripheralHandle,
    },
    /// Close a link
    CloseConnection { connection: ConnectionHandle },
    /// Look up the service and then the characteristic
    ResolveService {
        connection: ConnectionHandle,
        service: Uuid,
        characteristic: Uuid,
    },
    /// Subscribe to notifications through the CCCD
    EnableNotifications {
        characteristic: CharacteristicHandle,
        descriptor: Uuid,
    },
    /// Read the characteristic
    ReadCharacteristic { characteristic: CharacteristicHandle },
    /// Write the encoded value
    WriteCharacteristic {
        characteristic: CharacteristicHandle,
        value: u32,
        payload: [u8; VALUE_PAYLOAD_LEN],
    },
}

impl Effect {
    /// Whether the effect is handled by the executor's timer rather than the adapter
    pub fn is_timer(&self) -> bool {
        matches!(
            self,
            Effect::ArmScanTimeout { .. } | Effect::CancelScanTimeout
        )
    }
}
