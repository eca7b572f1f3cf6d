//! btleplug adapter configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the btleplug adapter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BtleplugConfig {
    /// How long the platform may take to bring a link up
    pub connection_timeout: Duration,
    /// Which of the host's adapters to use
    pub adapter_index: usize,
}

impl Default for BtleplugConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            adapter_index: 0,
        }
    }
}

impl BtleplugConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Select the host adapter by index
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }
}
