//! Command handlers for the blebridge CLI

use std::sync::Arc;

use blebridge_ble::BtleplugAdapter;
use blebridge_core::StatusSnapshot;
use blebridge_runtime::BleBridgeClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::cli::Commands;
use crate::config::CliConfig;
use crate::console::{self, ConsoleCommand, Readiness};
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command against a freshly opened adapter
    pub async fn execute(command: Commands, config: CliConfig) -> Result<()> {
        let adapter = Arc::new(BtleplugAdapter::new(config.adapter.clone()).await?);
        let client = BleBridgeClient::spawn(adapter.clone(), config.bridge.clone()).await?;

        let outcome = match command {
            Commands::Run => Self::handle_run_command(&client).await,
            Commands::Read => Self::handle_read_command(&client, &config).await,
            Commands::Write { value } => Self::handle_write_command(&client, &config, value).await,
        };

        // Tear down whatever the command left behind before reporting
        client.shutdown().await;
        adapter.shutdown().await;
        outcome
    }

    /// Handle the interactive console
    async fn handle_run_command(client: &BleBridgeClient) -> Result<()> {
        println!("{}", console::HELP);
        println!("{}", console::paint(&client.snapshot()));

        let mut snapshots = client.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Console input closed");
                        break;
                    };
                    match console::parse_line(&line) {
                        Ok(Some(ConsoleCommand::Quit)) => break,
                        Ok(Some(command)) => Self::handle_console_command(client, command).await,
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    }
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return Err(CliError::OperationFailed("Bridge task has stopped".to_string()));
                    }
                    println!("{}", console::paint(&snapshots.borrow_and_update()));
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, disconnecting");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_console_command(client: &BleBridgeClient, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Scan => client.start_scan().await,
            ConsoleCommand::Read => client.read_value().await,
            ConsoleCommand::Write(text) => client.write_value(text).await,
            ConsoleCommand::Input(text) => client.set_input(text).await,
            ConsoleCommand::Send => client.write_input().await,
            ConsoleCommand::Disconnect => client.disconnect().await,
            ConsoleCommand::Status => println!("{}", console::paint(&client.snapshot())),
            ConsoleCommand::Help => println!("{}", console::HELP),
            ConsoleCommand::Quit => {}
        }
    }

    /// Handle the one-shot read command
    async fn handle_read_command(client: &BleBridgeClient, config: &CliConfig) -> Result<()> {
        let mut snapshots = Self::connect(client, config).await?;

        client.read_value().await;
        let snapshot = Self::settle(&mut snapshots, console::read_outcome).await?;
        Self::report(&snapshot, console::read_outcome(&snapshot))
    }

    /// Handle the one-shot write command
    async fn handle_write_command(
        client: &BleBridgeClient,
        config: &CliConfig,
        value: String,
    ) -> Result<()> {
        let mut snapshots = Self::connect(client, config).await?;

        client.write_value(value).await;
        let snapshot = Self::settle(&mut snapshots, console::write_outcome).await?;
        Self::report(&snapshot, console::write_outcome(&snapshot))
    }

    /// Scan and wait until the characteristic is usable
    async fn connect(
        client: &BleBridgeClient,
        config: &CliConfig,
    ) -> Result<watch::Receiver<StatusSnapshot>> {
        let mut snapshots = client.subscribe();
        client.start_scan().await;

        let mut scanned = false;
        let waited = timeout(config.ready_timeout, async {
            loop {
                let readiness = {
                    let snapshot = snapshots.borrow_and_update();
                    scanned |= snapshot.state.is_active();
                    console::readiness(&snapshot, scanned)
                };
                match readiness {
                    Readiness::Ready => return Ok(()),
                    Readiness::Failed(status) => return Err(CliError::OperationFailed(status)),
                    Readiness::Pending => {}
                }
                if snapshots.changed().await.is_err() {
                    return Err(CliError::OperationFailed(
                        "Bridge task has stopped".to_string(),
                    ));
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result.map(|()| snapshots),
            Err(_) => Err(CliError::ReadyTimeout),
        }
    }

    /// Wait for the status line to settle on an outcome
    async fn settle<F>(
        snapshots: &mut watch::Receiver<StatusSnapshot>,
        outcome: F,
    ) -> Result<StatusSnapshot>
    where
        F: Fn(&StatusSnapshot) -> Option<std::result::Result<String, String>>,
    {
        let snapshot = snapshots
            .wait_for(|snapshot| outcome(snapshot).is_some())
            .await
            .map_err(|_| CliError::OperationFailed("Bridge task has stopped".to_string()))?;
        Ok(snapshot.clone())
    }

    fn report(
        snapshot: &StatusSnapshot,
        outcome: Option<std::result::Result<String, String>>,
    ) -> Result<()> {
        println!("{}", console::paint(snapshot));
        match outcome {
            Some(Ok(_)) | None => Ok(()),
            Some(Err(status)) => Err(CliError::OperationFailed(status)),
        }
    }
}
