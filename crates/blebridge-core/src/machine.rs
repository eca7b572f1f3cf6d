//! Bridge State Machine
//!
//! `BridgeMachine` owns the scanner, the connection manager and the value
//! channel, and is the only place where `ConnectionState` changes. It is
//! synchronous: each entry point applies one transition, updates the status
//! line and returns the effects the caller must execute in order. Callers must
//! serialize entry points (the runtime does this with a single task).
//!
//! Transitions:
//!
//! ```text
//! Idle/Disconnected/Failed --start_scan--> Scanning
//! Scanning --ScanResult--> Connecting      (scan stopped, never restarted)
//! Scanning --ScanTimedOut--> Idle
//! Scanning --ScanFailed--> Failed
//! Connecting --LinkEstablished--> Connecting (resolving services)
//! Connecting --ServicesResolved--> Connected (with or without characteristic)
//! Connecting --LinkFailed--> Failed
//! Connecting/Connected --LinkLost--> Disconnected
//! any --disconnect--> Disconnected
//! ```

use tracing::{debug, info, warn};

use crate::channel::ValueChannel;
use crate::config::BridgeConfig;
use crate::connection::ConnectionManager;
use crate::errors::{AdapterError, BridgeError, IoOperation};
use crate::handles::{CharacteristicHandle, ConnectionHandle, PeripheralHandle};
use crate::messages::{Effect, Event};
use crate::resolver::{self, Resolution};
use crate::scanner::Scanner;
use crate::state::{project, ConnectionState, StatusSnapshot};

// ----------------------------------------------------------------------------
// State Machine
// ----------------------------------------------------------------------------

/// Serialized controller for the single-peripheral bridge
#[derive(Debug, Clone)]
pub struct BridgeMachine {
    config: BridgeConfig,
    state: ConnectionState,
    status: String,
    input: String,
    /// Set by a capability/permission failure, cleared by the next scan
    fault: bool,
    scanner: Scanner,
    link: ConnectionManager,
    channel: ValueChannel,
}

impl Default for BridgeMachine {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl BridgeMachine {
    /// Create a machine in Idle
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Idle,
            status: "Waiting for Bluetooth...".to_string(),
            input: String::new(),
            fault: false,
            scanner: Scanner::new(),
            link: ConnectionManager::new(),
            channel: ValueChannel::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn value(&self) -> Option<u32> {
        self.channel.sample()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_active()
    }

    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.link.peripheral()
    }

    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.link.connection()
    }

    pub fn characteristic(&self) -> Option<&CharacteristicHandle> {
        self.channel.characteristic()
    }

    /// Project the current state into an immutable snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        project(
            self.state,
            &self.status,
            self.channel.sample(),
            &self.input,
            self.channel.is_ready(),
            self.fault,
        )
    }

    // ------------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------------

    /// Begin scanning unless already scanning, connecting or connected
    pub fn start_scan(&mut self, capability_granted: bool) -> Vec<Effect> {
        if self.state.is_active() || self.scanner.is_active() {
            debug!("Ignoring scan request while {}", self.state);
            return Vec::new();
        }

        if !capability_granted {
            self.fault = true;
            self.report(BridgeError::CapabilityDenied);
            return Vec::new();
        }

        self.fault = false;
        self.set_state(ConnectionState::Scanning);
        self.status = format!("Scanning for {}...", self.config.fallback_peripheral_name);
        self.scanner.start(self.config.scan_timeout)
    }

    /// Universal cancellation; safe from any state
    pub fn disconnect(&mut self) -> Vec<Effect> {
        let effects = self.teardown();
        self.set_state(ConnectionState::Disconnected);
        self.status = "Disconnected".to_string();
        effects
    }

    /// Read the characteristic, or report that there is none
    pub fn read_value(&mut self) -> Vec<Effect> {
        match self.channel.read() {
            Ok(effect) => {
                self.status = "Reading...".to_string();
                vec![effect]
            }
            Err(err) => {
                self.report(err);
                Vec::new()
            }
        }
    }

    /// Parse `text` and write it
    pub fn write_value(&mut self, text: &str) -> Vec<Effect> {
        match self.channel.write(text) {
            Ok(effect) => {
                if let Effect::WriteCharacteristic { value, .. } = &effect {
                    self.status = format!("Writing {}...", value);
                }
                vec![effect]
            }
            Err(err) => {
                self.report(err);
                Vec::new()
            }
        }
    }

    /// Write the pending input text
    pub fn write_input(&mut self) -> Vec<Effect> {
        let text = self.input.clone();
        self.write_value(&text)
    }

    /// Replace the pending input text
    pub fn set_input(&mut self, text: String) {
        self.input = text;
    }

    /// The front-end was refused Bluetooth permissions
    pub fn permissions_denied(&mut self) {
        self.fault = true;
        self.report(BridgeError::CapabilityDenied);
    }

    // ------------------------------------------------------------------------
    // Adapter-driven events
    // ------------------------------------------------------------------------

    /// Apply an event from the adapter or the scan timer
    pub fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::ScanResult { peripheral } => self.on_scan_result(peripheral),
            Event::ScanFailed { code } => self.on_scan_failed(code),
            Event::ScanTimedOut { scan } => self.on_scan_timeout(scan),
            Event::LinkEstablished {
                attempt,
                connection,
            } => self.on_link_established(attempt, connection),
            Event::LinkFailed { attempt, reason } => self.on_link_failed(attempt, reason),
            Event::LinkLost { connection, reason } => self.on_link_lost(connection, reason),
            Event::ServicesResolved {
                connection,
                resolution,
            } => self.on_services_resolved(connection, resolution),
            Event::NotificationsEnabled {
                characteristic,
                result,
            } => self.on_notifications_enabled(characteristic, result),
            Event::CharacteristicRead {
                characteristic,
                result,
            } => self.on_characteristic_read(characteristic, result),
            Event::CharacteristicChanged {
                characteristic,
                value,
            } => self.on_characteristic_changed(characteristic, value),
            Event::WriteCompleted {
                characteristic,
                value,
                result,
            } => self.on_write_complete(characteristic, value, result),
            Event::AdapterPowered { powered } => self.on_adapter_powered(powered),
        }
    }

    fn on_scan_result(&mut self, peripheral: PeripheralHandle) -> Vec<Effect> {
        if self.state != ConnectionState::Scanning || !self.scanner.is_active() {
            debug!("Ignoring advertisement from {} while {}", peripheral, self.state);
            return Vec::new();
        }

        info!("Found peripheral {}", peripheral);
        let name = peripheral
            .name()
            .unwrap_or(&self.config.fallback_peripheral_name)
            .to_string();

        let mut effects = self.scanner.stop();
        self.channel.clear();
        effects.extend(self.link.begin(peripheral));
        self.set_state(ConnectionState::Connecting);
        self.status = format!("Connecting to {}...", name);
        effects
    }

    fn on_scan_failed(&mut self, code: String) -> Vec<Effect> {
        if !self.scanner.is_active() {
            return Vec::new();
        }
        let effects = self.scanner.mark_failed();
        self.set_state(ConnectionState::Failed);
        self.report(BridgeError::ScanFailure { code });
        effects
    }

    fn on_scan_timeout(&mut self, scan: u64) -> Vec<Effect> {
        match self.scanner.expire(scan) {
            Some(effects) => {
                self.set_state(ConnectionState::Idle);
                self.report(BridgeError::ScanTimeout);
                effects
            }
            None => {
                debug!("Ignoring stale scan timer {}", scan);
                Vec::new()
            }
        }
    }

    fn on_link_established(&mut self, attempt: u64, connection: ConnectionHandle) -> Vec<Effect> {
        // An attempt is only outstanding while Connecting, so this also
        // rejects links that come up after a disconnect.
        if let Err(effects) = self.link.establish(attempt, connection) {
            return effects;
        }
        info!("Link {} established, resolving services", connection);
        self.status = "Connected. Discovering services...".to_string();
        vec![resolver::request(connection)]
    }

    fn on_link_failed(&mut self, attempt: u64, reason: String) -> Vec<Effect> {
        if !self.link.fail(attempt) {
            debug!("Ignoring failure of abandoned attempt {}", attempt);
            return Vec::new();
        }
        self.channel.clear();
        self.set_state(ConnectionState::Failed);
        self.report(BridgeError::ConnectionError { reason });
        Vec::new()
    }

    fn on_link_lost(&mut self, connection: ConnectionHandle, reason: Option<String>) -> Vec<Effect> {
        if !self.link.owns(connection) {
            debug!("Ignoring loss of unowned link {}", connection);
            return Vec::new();
        }
        if let Some(reason) = &reason {
            info!("Link {} lost: {}", connection, reason);
        }
        let effects = self.link.lost(connection);
        self.channel.clear();
        self.set_state(ConnectionState::Disconnected);
        self.status = "Disconnected".to_string();
        effects
    }

    fn on_services_resolved(
        &mut self,
        connection: ConnectionHandle,
        resolution: Resolution,
    ) -> Vec<Effect> {
        if !self.link.owns(connection) || self.state != ConnectionState::Connecting {
            debug!("Ignoring resolution for {}", connection);
            return Vec::new();
        }
        if let Resolution::Failed(err) = &resolution {
            if err.is_link_lost() {
                return self.drop_link();
            }
        }

        self.set_state(ConnectionState::Connected);
        match resolver::complete(resolution) {
            Ok((characteristic, effects)) => {
                self.channel.bind(characteristic);
                self.status = "Ready".to_string();
                effects
            }
            Err(err) => {
                self.report(err);
                Vec::new()
            }
        }
    }

    fn on_notifications_enabled(
        &mut self,
        characteristic: CharacteristicHandle,
        result: Result<(), AdapterError>,
    ) -> Vec<Effect> {
        if !self.channel.owns(&characteristic) {
            return Vec::new();
        }
        match result {
            Ok(()) => {
                debug!("Notifications enabled on {}", characteristic.uuid);
                Vec::new()
            }
            Err(err) if err.is_link_lost() => self.drop_link(),
            Err(err) => {
                self.report(BridgeError::io(IoOperation::EnableNotify, &err));
                Vec::new()
            }
        }
    }

    fn on_characteristic_read(
        &mut self,
        characteristic: CharacteristicHandle,
        result: Result<Vec<u8>, AdapterError>,
    ) -> Vec<Effect> {
        if !self.channel.owns(&characteristic) {
            return Vec::new();
        }
        match result {
            Ok(payload) => {
                match self.channel.accept(&payload) {
                    Ok(value) => self.status = format!("Value: {}", value),
                    Err(err) => self.report(err.into()),
                }
                Vec::new()
            }
            Err(err) if err.is_link_lost() => self.drop_link(),
            Err(err) => {
                self.report(BridgeError::io(IoOperation::Read, &err));
                Vec::new()
            }
        }
    }

    fn on_characteristic_changed(
        &mut self,
        characteristic: CharacteristicHandle,
        payload: Vec<u8>,
    ) -> Vec<Effect> {
        if !self.channel.owns(&characteristic) {
            return Vec::new();
        }
        match self.channel.accept(&payload) {
            Ok(value) => self.status = format!("Notification: {}", value),
            Err(err) => self.report(err.into()),
        }
        Vec::new()
    }

    fn on_write_complete(
        &mut self,
        characteristic: CharacteristicHandle,
        value: u32,
        result: Result<(), AdapterError>,
    ) -> Vec<Effect> {
        if !self.channel.owns(&characteristic) {
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.status = format!("Write succeeded: {}", value);
                Vec::new()
            }
            Err(err) if err.is_link_lost() => self.drop_link(),
            Err(err) => {
                self.report(BridgeError::io(IoOperation::Write, &err));
                Vec::new()
            }
        }
    }

    fn on_adapter_powered(&mut self, powered: bool) -> Vec<Effect> {
        if powered {
            if !self.state.is_active() {
                self.status = "Bluetooth ready. Start a scan to connect.".to_string();
            }
            return Vec::new();
        }

        let effects = if self.state.is_active() {
            let effects = self.teardown();
            self.set_state(ConnectionState::Disconnected);
            effects
        } else {
            Vec::new()
        };
        self.status = "Bluetooth is off".to_string();
        effects
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Stop scanning and release every handle
    fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = self.scanner.stop();
        effects.extend(self.link.release());
        self.channel.clear();
        effects
    }

    /// An I/O completion said the link is gone
    fn drop_link(&mut self) -> Vec<Effect> {
        warn!("Link lost during I/O, disconnecting");
        let effects = self.teardown();
        self.set_state(ConnectionState::Disconnected);
        self.status = "Disconnected".to_string();
        effects
    }

    fn report(&mut self, err: BridgeError) {
        debug!("Status: {}", err);
        self.status = err.to_string();
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            info!("State {} -> {}", self.state, next);
            self.state = next;
        }
    }
}
