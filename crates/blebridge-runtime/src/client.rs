//! BleBridgeClient
//!
//! Cheap, cloneable handle to the bridge task. User operations are fire and
//! forget: they queue a command and return, and their outcome shows up in the
//! next [`StatusSnapshot`]. None of them can fail from the caller's point of
//! view; a stopped client logs a warning and ignores the call.

use std::sync::Arc;

use blebridge_core::{BleAdapter, BridgeConfig, Command, StatusSnapshot};
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::error::{RuntimeError, RuntimeResult};
use crate::task::BridgeTask;

#[derive(Debug, Clone)]
pub struct BleBridgeClient {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<StatusSnapshot>,
}

impl BleBridgeClient {
    /// Take the adapter's event stream and start the bridge task
    ///
    /// Must be called from within a tokio runtime.
    pub async fn spawn(adapter: Arc<dyn BleAdapter>, config: BridgeConfig) -> RuntimeResult<Self> {
        let adapter_events = adapter.events().await.map_err(RuntimeError::EventStream)?;

        let (command_sender, command_receiver) = mpsc::channel(config.command_buffer_size.max(1));
        let (snapshot_sender, snapshots) = watch::channel(StatusSnapshot::initial());

        let task = BridgeTask::new(
            adapter,
            config,
            command_receiver,
            adapter_events,
            snapshot_sender,
        );
        tokio::spawn(task.run());

        Ok(Self {
            commands: command_sender,
            snapshots,
        })
    }

    // ------------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------------

    /// Scan for the peripheral and connect to the first match
    pub async fn start_scan(&self) {
        self.send(Command::StartScan).await;
    }

    /// Stop scanning, close the link and clear the value; safe from any state
    pub async fn disconnect(&self) {
        self.send(Command::Disconnect).await;
    }

    pub async fn read_value(&self) {
        self.send(Command::ReadValue).await;
    }

    /// Parse `text` (decimal or `0x` hex) and write it
    pub async fn write_value(&self, text: impl Into<String>) {
        self.send(Command::WriteValue { text: text.into() }).await;
    }

    /// Write the text last set with [`set_input`](Self::set_input)
    pub async fn write_input(&self) {
        self.send(Command::WriteInput).await;
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.send(Command::SetInput { text: text.into() }).await;
    }

    /// Report that the front-end was refused Bluetooth permissions
    pub async fn permissions_denied(&self) {
        self.send(Command::PermissionsDenied).await;
    }

    /// Tear down and wait for the bridge task to finish
    ///
    /// Other handles stop working once this returns.
    pub async fn shutdown(self) {
        self.send(Command::Shutdown).await;
        self.commands.closed().await;
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Latest published snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.snapshots.clone()
    }

    /// Check if the bridge task is still running
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn send(&self, command: Command) {
        if let Err(err) = self.commands.send(command).await {
            warn!("{}, ignoring {:?}", RuntimeError::TaskStopped, err.0);
        }
    }
}
