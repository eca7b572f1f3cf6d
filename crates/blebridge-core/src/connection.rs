//! Connection ownership
//!
//! At most one peripheral is owned at a time. A connect attempt is numbered so
//! a link that comes up after the attempt was abandoned can be recognized and
//! closed instead of adopted.

use tracing::debug;

use crate::handles::{ConnectionHandle, PeripheralHandle};
use crate::messages::Effect;

/// Owns the single peripheral and its link
#[derive(Debug, Default, Clone)]
pub struct ConnectionManager {
    attempt: u64,
    pending: Option<u64>,
    peripheral: Option<PeripheralHandle>,
    connection: Option<ConnectionHandle>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peripheral currently owned, connecting or connected
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.peripheral.as_ref()
    }

    /// Live link, if the current attempt succeeded
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.connection
    }

    /// Start a new attempt, closing whatever was owned before
    pub fn begin(&mut self, peripheral: PeripheralHandle) -> Vec<Effect> {
        let mut effects = self.release();
        self.attempt += 1;
        self.pending = Some(self.attempt);
        self.peripheral = Some(peripheral.clone());
        effects.push(Effect::Connect {
            attempt: self.attempt,
            peripheral,
        });
        effects
    }

    /// Adopt a link if it belongs to the outstanding attempt
    ///
    /// Returns the effects to close it otherwise.
    pub fn establish(&mut self, attempt: u64, connection: ConnectionHandle) -> Result<(), Vec<Effect>> {
        if self.pending != Some(attempt) {
            debug!("Closing link {} from abandoned attempt {}", connection, attempt);
            return Err(vec![Effect::CloseConnection { connection }]);
        }
        self.pending = None;
        self.connection = Some(connection);
        Ok(())
    }

    /// Record a failed attempt; false if it was not the outstanding one
    pub fn fail(&mut self, attempt: u64) -> bool {
        if self.pending != Some(attempt) {
            return false;
        }
        self.pending = None;
        self.peripheral = None;
        true
    }

    /// Check whether `connection` is the owned link
    pub fn owns(&self, connection: ConnectionHandle) -> bool {
        self.connection == Some(connection)
    }

    /// Forget a link the platform already dropped
    pub fn lost(&mut self, connection: ConnectionHandle) -> Vec<Effect> {
        if !self.owns(connection) {
            return Vec::new();
        }
        self.connection = None;
        self.peripheral = None;
        vec![Effect::CloseConnection { connection }]
    }

    /// Release everything; safe to call in any state
    pub fn release(&mut self) -> Vec<Effect> {
        self.pending = None;
        self.peripheral = None;
        match self.connection.take() {
            Some(connection) => vec![Effect::CloseConnection { connection }],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peripheral() -> PeripheralHandle {
        PeripheralHandle::new("AA:BB", Some("ESP32".to_string()))
    }

    #[test]
    fn test_abandoned_attempt_is_closed() {
        let mut manager = ConnectionManager::new();
        manager.begin(peripheral());
        manager.release();

        let late = ConnectionHandle::new(7);
        assert_eq!(
            manager.establish(1, late),
            Err(vec![Effect::CloseConnection { connection: late }])
        );
        assert!(manager.connection().is_none());
    }

    #[test]
    fn test_new_attempt_replaces_previous_link() {
        let mut manager = ConnectionManager::new();
        manager.begin(peripheral());
        let first = ConnectionHandle::new(1);
        assert!(manager.establish(1, first).is_ok());

        let effects = manager.begin(peripheral());
        assert_eq!(effects[0], Effect::CloseConnection { connection: first });
        assert!(matches!(effects[1], Effect::Connect { attempt: 2, .. }));

        // The replaced link coming up late is closed, not adopted
        assert_eq!(
            manager.establish(1, ConnectionHandle::new(9)),
            Err(vec![Effect::CloseConnection {
                connection: ConnectionHandle::new(9)
            }])
        );
    }
}
