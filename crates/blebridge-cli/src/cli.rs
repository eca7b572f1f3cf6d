//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Index of the host Bluetooth adapter to use
    #[arg(short, long, default_value_t = 0)]
    pub adapter: usize,

    /// Seconds a one-shot command waits for the characteristic to be ready
    #[arg(long, default_value_t = 30)]
    pub ready_timeout: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive console
    Run,
    /// Connect, read the value once and exit
    Read,
    /// Connect, write a value once and exit
    Write {
        /// Decimal or 0x-prefixed hexadecimal value
        value: String,
    },
}
