//! Effect Worker
//!
//! Executes adapter effects one at a time in the order the machine emitted
//! them, so a stop always lands after the start it cancels. Each completion is
//! turned into an [`Event`] and sent back to the bridge task. Timer effects are
//! handled by the bridge task and never reach the worker.
//!
//! Connect attempts are the exception: each runs on its own task tagged with
//! its attempt number, so a slow link never holds up a later scan or close.
//! The machine closes links from abandoned attempts when they report in.

use std::sync::Arc;

use blebridge_core::{AdapterError, BleAdapter, Effect, Event, PeripheralHandle};
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, warn};

use crate::resolver::resolve_value_characteristic;

/// Run until the effect channel closes and every connect attempt has settled
pub(crate) async fn run_effects(
    adapter: Arc<dyn BleAdapter>,
    mut effects: mpsc::UnboundedReceiver<Effect>,
    events: mpsc::UnboundedSender<Event>,
) {
    debug!("Effect worker starting");
    let mut connects = JoinSet::new();

    loop {
        tokio::select! {
            effect = effects.recv() => {
                let Some(effect) = effect else {
                    break;
                };
                debug!("Executing {:?}", effect);
                match effect {
                    Effect::Connect {
                        attempt,
                        peripheral,
                    } => {
                        connects.spawn(connect(
                            Arc::clone(&adapter),
                            attempt,
                            peripheral,
                            events.clone(),
                        ));
                    }
                    effect => {
                        if let Some(event) = execute(adapter.as_ref(), effect).await {
                            if events.send(event).is_err() {
                                debug!("Bridge task gone, dropping completion");
                            }
                        }
                    }
                }
            }

            Some(joined) = connects.join_next(), if !connects.is_empty() => {
                if let Err(err) = joined {
                    warn!("Connect task ended abnormally: {}", err);
                }
            }
        }
    }

    // Links still coming up are closed by their own task once nobody can adopt them
    while let Some(joined) = connects.join_next().await {
        if let Err(err) = joined {
            warn!("Connect task ended abnormally: {}", err);
        }
    }

    debug!("Effect worker stopped");
}

/// Bring a link up and report it tagged with `attempt`
async fn connect(
    adapter: Arc<dyn BleAdapter>,
    attempt: u64,
    peripheral: PeripheralHandle,
    events: mpsc::UnboundedSender<Event>,
) {
    let event = match adapter.connect(&peripheral).await {
        Ok(connection) => Event::LinkEstablished {
            attempt,
            connection,
        },
        Err(err) => Event::LinkFailed {
            attempt,
            reason: err.to_string(),
        },
    };

    if let Err(unsent) = events.send(event) {
        if let Event::LinkEstablished { connection, .. } = unsent.0 {
            debug!("Closing {} from attempt {} after shutdown", connection, attempt);
            if let Err(err) = adapter.close_connection(connection).await {
                warn!("Failed to close {}: {}", connection, err);
            }
        }
    }
}

/// Perform one effect and map its outcome to an event, if it has one
async fn execute(adapter: &dyn BleAdapter, effect: Effect) -> Option<Event> {
    match effect {
        Effect::StartScan { service } => match adapter.start_scan(service).await {
            Ok(()) => None,
            Err(AdapterError::NotStarted(code)) => Some(Event::ScanFailed { code }),
            Err(err) => Some(Event::ScanFailed {
                code: err.to_string(),
            }),
        },
        Effect::StopScan => {
            if let Err(err) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", err);
            }
            None
        }
        // Spawned by `run_effects`
        Effect::Connect { .. } => None,
        Effect::CloseConnection { connection } => {
            if let Err(err) = adapter.close_connection(connection).await {
                warn!("Failed to close {}: {}", connection, err);
            }
            None
        }
        Effect::ResolveService {
            connection,
            service,
            characteristic,
        } => {
            let resolution =
                resolve_value_characteristic(adapter, connection, service, characteristic).await;
            Some(Event::ServicesResolved {
                connection,
                resolution,
            })
        }
        Effect::EnableNotifications {
            characteristic,
            descriptor,
        } => {
            let result = adapter
                .enable_notifications(&characteristic, descriptor)
                .await;
            Some(Event::NotificationsEnabled {
                characteristic,
                result,
            })
        }
        Effect::ReadCharacteristic { characteristic } => {
            let result = adapter.read_characteristic(&characteristic).await;
            Some(Event::CharacteristicRead {
                characteristic,
                result,
            })
        }
        Effect::WriteCharacteristic {
            characteristic,
            value,
            payload,
        } => {
            let result = adapter.write_characteristic(&characteristic, &payload).await;
            Some(Event::WriteCompleted {
                characteristic,
                value,
                result,
            })
        }
        Effect::ArmScanTimeout { .. } | Effect::CancelScanTimeout => {
            debug!("Timer effect reached the effect worker, ignoring");
            None
        }
    }
}
