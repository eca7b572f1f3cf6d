//! Platform BLE adapter capability
//!
//! The bridge never talks to an OS stack directly. A platform crate implements
//! [`BleAdapter`] and the runtime drives it. Every method may take as long as
//! the platform needs; the runtime runs them off the state-machine task, so
//! they never stall state transitions.
//!
//! Unsolicited traffic (advertisements, link drops, notifications, power
//! changes) arrives through the stream returned by [`BleAdapter::events`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::errors::AdapterError;
use crate::handles::{CharacteristicHandle, ConnectionHandle, PeripheralHandle, ServiceHandle};

// ----------------------------------------------------------------------------
// Adapter Events
// ----------------------------------------------------------------------------

/// Events an adapter reports without being asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// An advertisement matching the scan filter was observed
    Discovered(PeripheralHandle),
    /// The platform scanner stopped with an error code
    ScanFailed { code: String },
    /// A link went down, locally or from the peer
    Disconnected {
        connection: ConnectionHandle,
        reason: Option<String>,
    },
    /// The peripheral pushed a notification
    ValueChanged {
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    /// The radio was switched on or off
    PoweredChanged { powered: bool },
}

/// Stream of unsolicited adapter events
pub type AdapterEventStream = Pin<Box<dyn Stream<Item = AdapterEvent> + Send>>;

// ----------------------------------------------------------------------------
// Adapter Capability
// ----------------------------------------------------------------------------

/// Capability interface backed by a platform BLE stack
#[async_trait]
pub trait BleAdapter: Send + Sync {
    /// Whether the process may scan (permissions granted, radio present)
    async fn scan_capability_granted(&self) -> bool;

    /// Take the stream of unsolicited events
    ///
    /// Called once when the client starts.
    async fn events(&self) -> Result<AdapterEventStream, AdapterError>;

    /// Start scanning for advertisements carrying `service`
    async fn start_scan(&self, service: Uuid) -> Result<(), AdapterError>;

    /// Stop an active scan
    async fn stop_scan(&self) -> Result<(), AdapterError>;

    /// Establish a link; resolves once the link is up
    async fn connect(&self, peripheral: &PeripheralHandle)
        -> Result<ConnectionHandle, AdapterError>;

    /// Tear down a link and release its resources
    async fn close_connection(&self, connection: ConnectionHandle) -> Result<(), AdapterError>;

    /// Look up a service on a connected peripheral
    async fn discover_service(
        &self,
        connection: ConnectionHandle,
        service: Uuid,
    ) -> Result<Option<ServiceHandle>, AdapterError>;

    /// Look up a characteristic within a discovered service
    async fn discover_characteristic(
        &self,
        service: &ServiceHandle,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicHandle>, AdapterError>;

    /// Turn on notifications by writing the enable value to `descriptor`
    async fn enable_notifications(
        &self,
        characteristic: &CharacteristicHandle,
        descriptor: Uuid,
    ) -> Result<(), AdapterError>;

    /// Read the current characteristic value
    async fn read_characteristic(
        &self,
        characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, AdapterError>;

    /// Write with response
    async fn write_characteristic(
        &self,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), AdapterError>;
}
