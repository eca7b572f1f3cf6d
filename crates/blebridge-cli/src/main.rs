//! blebridge - talk to the ESP32 value bridge from a terminal

use clap::Parser;
use tracing::{error, info};

use blebridge_cli::{cli::Cli, commands::CommandDispatcher, config::CliConfig, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = CliConfig::from_cli(&cli);

    if let Err(e) = CommandDispatcher::execute(cli.command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("blebridge exited");
    Ok(())
}

/// Setup logging based on verbosity level
///
/// Logs go to stderr so they do not interleave with console output.
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
