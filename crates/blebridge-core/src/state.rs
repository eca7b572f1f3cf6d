//! Connection states and the observable status snapshot

use std::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Connection State
// ----------------------------------------------------------------------------

/// Lifecycle of the single peripheral connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Idle,
    Scanning,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    /// Get current state name for display and logging
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Scanning => "Scanning",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Failed => "Failed",
        }
    }

    /// Scanning, connecting or connected
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Scanning | ConnectionState::Connecting | ConnectionState::Connected
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coloring hint for the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Neutral,
    Ok,
    Warn,
    Error,
}

// ----------------------------------------------------------------------------
// Status Snapshot
// ----------------------------------------------------------------------------

/// Immutable view of the bridge, republished after every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub status: String,
    pub value: Option<u32>,
    pub input: String,
    pub severity: Severity,
    /// Whether the value characteristic is resolved and usable
    pub ready: bool,
}

impl StatusSnapshot {
    /// Snapshot before anything has happened
    pub fn initial() -> Self {
        project(
            ConnectionState::Idle,
            "Waiting for Bluetooth...",
            None,
            "",
            false,
            false,
        )
    }

    /// "Last value: N" or "No value yet"
    pub fn value_label(&self) -> String {
        match self.value {
            Some(value) => format!("Last value: {}", value),
            None => "No value yet".to_string(),
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Fold machine state into a snapshot
pub fn project(
    state: ConnectionState,
    status: &str,
    value: Option<u32>,
    input: &str,
    ready: bool,
    fault: bool,
) -> StatusSnapshot {
    let severity = match state {
        ConnectionState::Connected if ready => Severity::Ok,
        ConnectionState::Connected | ConnectionState::Scanning | ConnectionState::Connecting => {
            Severity::Warn
        }
        ConnectionState::Failed => Severity::Error,
        ConnectionState::Idle | ConnectionState::Disconnected if fault => Severity::Error,
        ConnectionState::Idle | ConnectionState::Disconnected => Severity::Neutral,
    };

    StatusSnapshot {
        state,
        status: status.to_string(),
        value,
        input: input.to_string(),
        severity,
        ready,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        let connected = project(ConnectionState::Connected, "Ready", Some(1), "", true, false);
        assert_eq!(connected.severity, Severity::Ok);

        let unresolved = project(ConnectionState::Connected, "", None, "", false, false);
        assert_eq!(unresolved.severity, Severity::Warn);

        let denied = project(ConnectionState::Idle, "", None, "", false, true);
        assert_eq!(denied.severity, Severity::Error);

        let idle = project(ConnectionState::Idle, "", None, "", false, false);
        assert_eq!(idle.severity, Severity::Neutral);

        let failed = project(ConnectionState::Failed, "", None, "", false, false);
        assert_eq!(failed.severity, Severity::Error);
    }

    #[test]
    fn test_value_label() {
        let mut snapshot = StatusSnapshot::initial();
        assert_eq!(snapshot.value_label(), "No value yet");
        snapshot.value = Some(42);
        assert_eq!(snapshot.value_label(), "Last value: 42");
    }
}
