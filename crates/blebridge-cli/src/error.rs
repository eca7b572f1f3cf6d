//! Error handling for the blebridge CLI

use blebridge_ble::BleAdapterError;
use blebridge_runtime::RuntimeError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Bluetooth adapter error: {0}")]
    Adapter(#[from] BleAdapterError),

    #[error("Bridge client error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Unknown command: {0} (type 'help')")]
    UnknownCommand(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("{0}")]
    OperationFailed(String),

    #[error("Timed out waiting for the peripheral")]
    ReadyTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
