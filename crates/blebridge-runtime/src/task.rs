//! Bridge Task
//!
//! The single owner of the `BridgeMachine`. Commands from client handles,
//! completions from the effect worker, timer expiry and unsolicited adapter
//! events are all applied here, one at a time, and a fresh snapshot is
//! published after each.

use std::sync::Arc;

use blebridge_core::{
    AdapterEvent, AdapterEventStream, BleAdapter, BridgeConfig, BridgeMachine, Command, Effect,
    Event, StatusSnapshot,
};
use futures::StreamExt;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::executor::run_effects;
use crate::timer::ScanTimer;

// ----------------------------------------------------------------------------
// Bridge Task
// ----------------------------------------------------------------------------

pub(crate) struct BridgeTask {
    machine: BridgeMachine,
    adapter: Arc<dyn BleAdapter>,
    /// Commands from every client handle
    commands: mpsc::Receiver<Command>,
    /// Completions from the effect worker and the scan timer
    events: mpsc::UnboundedReceiver<Event>,
    event_sender: mpsc::UnboundedSender<Event>,
    /// Unsolicited adapter traffic; `None` once the stream has ended
    adapter_events: Option<AdapterEventStream>,
    effect_sender: mpsc::UnboundedSender<Effect>,
    worker: JoinHandle<()>,
    scan_timer: ScanTimer,
    snapshots: watch::Sender<StatusSnapshot>,
    running: bool,
}

impl BridgeTask {
    /// Build the task and start its effect worker
    pub(crate) fn new(
        adapter: Arc<dyn BleAdapter>,
        config: BridgeConfig,
        commands: mpsc::Receiver<Command>,
        adapter_events: AdapterEventStream,
        snapshots: watch::Sender<StatusSnapshot>,
    ) -> Self {
        let (event_sender, events) = mpsc::unbounded_channel();
        let (effect_sender, effect_receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_effects(
            Arc::clone(&adapter),
            effect_receiver,
            event_sender.clone(),
        ));

        Self {
            machine: BridgeMachine::new(config),
            adapter,
            commands,
            events,
            event_sender,
            adapter_events: Some(adapter_events),
            effect_sender,
            worker,
            scan_timer: ScanTimer::default(),
            snapshots,
            running: true,
        }
    }

    /// Run until `Shutdown` or until every client handle is dropped
    pub(crate) async fn run(mut self) {
        info!("Bridge task starting");
        self.publish();

        while self.running {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            info!("All client handles dropped, shutting down");
                            self.teardown();
                        }
                    }
                }

                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }

                adapter_event = next_adapter_event(&mut self.adapter_events) => {
                    match adapter_event {
                        Some(event) => self.handle_event(event.into()),
                        None => {
                            warn!("Adapter event stream ended");
                            self.adapter_events = None;
                        }
                    }
                }
            }
        }

        self.finish().await;
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("Command: {:?}", command);
        let effects = match command {
            Command::StartScan => {
                let granted = self.adapter.scan_capability_granted().await;
                self.machine.start_scan(granted)
            }
            Command::Disconnect => self.machine.disconnect(),
            Command::ReadValue => self.machine.read_value(),
            Command::WriteValue { text } => self.machine.write_value(&text),
            Command::WriteInput => self.machine.write_input(),
            Command::SetInput { text } => {
                self.machine.set_input(text);
                Vec::new()
            }
            Command::PermissionsDenied => {
                self.machine.permissions_denied();
                Vec::new()
            }
            Command::Shutdown => {
                info!("Shutdown requested");
                self.teardown();
                return;
            }
        };
        self.dispatch(effects);
        self.publish();
    }

    fn handle_event(&mut self, event: Event) {
        debug!("Event: {:?}", event);
        let effects = self.machine.handle_event(event);
        self.dispatch(effects);
        self.publish();
    }

    /// Run the universal teardown and stop the loop
    fn teardown(&mut self) {
        let effects = self.machine.disconnect();
        self.dispatch(effects);
        self.publish();
        self.running = false;
    }

    /// Route timer effects to the scan timer and the rest to the worker
    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmScanTimeout { scan, after } => {
                    self.scan_timer
                        .arm(scan, after, self.event_sender.clone());
                }
                Effect::CancelScanTimeout => self.scan_timer.cancel(),
                effect => {
                    if self.effect_sender.send(effect).is_err() {
                        warn!("Effect worker stopped, dropping effect");
                    }
                }
            }
        }
    }

    fn publish(&self) {
        let next = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Let the worker drain the teardown effects before the task ends
    async fn finish(self) {
        let Self {
            events,
            effect_sender,
            worker,
            mut scan_timer,
            ..
        } = self;

        scan_timer.cancel();
        // Completions arriving from here on have no machine to apply to
        drop(events);
        drop(effect_sender);
        if let Err(err) = worker.await {
            warn!("Effect worker ended abnormally: {}", err);
        }
        info!("Bridge task stopped");
    }
}

/// Next unsolicited adapter event; pending forever once the stream is gone
async fn next_adapter_event(stream: &mut Option<AdapterEventStream>) -> Option<AdapterEvent> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
