//! blebridge CLI library
//!
//! Terminal front-end for the ESP32 value bridge: argument parsing, the
//! interactive console and the one-shot read/write commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;

pub use cli::{Cli, Commands};
pub use config::CliConfig;
pub use error::{CliError, Result};
