//! CLI configuration, assembled from command-line arguments only

use std::time::Duration;

use blebridge_ble::BtleplugConfig;
use blebridge_runtime::BridgeConfig;

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub verbose: bool,
    /// How long one-shot commands wait for the characteristic
    pub ready_timeout: Duration,
    pub bridge: BridgeConfig,
    pub adapter: BtleplugConfig,
}

impl CliConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            verbose: cli.verbose,
            ready_timeout: Duration::from_secs(cli.ready_timeout),
            bridge: BridgeConfig::default(),
            adapter: BtleplugConfig::default().with_adapter_index(cli.adapter),
        }
    }
}
