//! Bridge configuration

use std::time::Duration;

use crate::protocol::{DEFAULT_PERIPHERAL_NAME, SCAN_TIMEOUT};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the bridge client
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BridgeConfig {
    /// How long a scan runs without a match before giving up
    pub scan_timeout: Duration,
    /// Name shown while connecting to a peripheral that advertises none
    pub fallback_peripheral_name: String,
    /// Capacity of the command channel into the client task
    pub command_buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scan_timeout: SCAN_TIMEOUT,
            fallback_peripheral_name: DEFAULT_PERIPHERAL_NAME.to_string(),
            command_buffer_size: 32,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scan timeout
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the fallback peripheral name
    pub fn with_fallback_peripheral_name(mut self, name: String) -> Self {
        self.fallback_peripheral_name = name;
        self
    }

    /// Set command channel capacity
    pub fn with_command_buffer_size(mut self, size: usize) -> Self {
        self.command_buffer_size = size.max(1);
        self
    }
}
