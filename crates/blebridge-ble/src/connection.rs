//! BLE connection management and characteristic I/O

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blebridge_core::{
    AdapterEvent, CharacteristicHandle, ConnectionHandle, ServiceHandle,
    CLIENT_CHARACTERISTIC_CONFIG_UUID,
};
use btleplug::api::{Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::BtleplugConfig;
use crate::error::{BleAdapterError, BleAdapterResult};
use crate::link::{find_characteristic, BleLink};

// ----------------------------------------------------------------------------
// Connection Management
// ----------------------------------------------------------------------------

/// Owns every live link and performs GATT operations on them
pub(crate) struct BleConnection {
    config: BtleplugConfig,
    links: Arc<RwLock<HashMap<ConnectionHandle, BleLink>>>,
    next_connection: AtomicU64,
    events: mpsc::UnboundedSender<AdapterEvent>,
}

impl BleConnection {
    pub(crate) fn new(config: BtleplugConfig, events: mpsc::UnboundedSender<AdapterEvent>) -> Self {
        Self {
            config,
            links: Arc::new(RwLock::new(HashMap::new())),
            next_connection: AtomicU64::new(1),
            events,
        }
    }

    /// Shared view of the links for the central event pump
    pub(crate) fn links(&self) -> Arc<RwLock<HashMap<ConnectionHandle, BleLink>>> {
        Arc::clone(&self.links)
    }

    /// Bring a link up and register it under a fresh handle
    pub(crate) async fn connect(&self, peripheral: Peripheral) -> BleAdapterResult<ConnectionHandle> {
        let id = peripheral.id();
        match timeout(self.config.connection_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Failed to connect to {}: {}", id, e);
                return Err(e.into());
            }
            Err(_) => {
                error!("Connection to {} timed out", id);
                // Abandon the platform's attempt so it does not complete later
                if let Err(e) = peripheral.disconnect().await {
                    debug!("Failed to cancel connection to {}: {}", id, e);
                }
                return Err(BleAdapterError::ConnectionTimeout);
            }
        }

        let connection = ConnectionHandle::new(self.next_connection.fetch_add(1, Ordering::Relaxed));
        self.links
            .write()
            .await
            .insert(connection, BleLink::new(connection, peripheral));
        info!("Connected to {} as {}", id, connection);
        Ok(connection)
    }

    /// Disconnect and forget a link; unknown handles are ignored
    pub(crate) async fn close(&self, connection: ConnectionHandle) -> BleAdapterResult<()> {
        let Some(mut link) = self.links.write().await.remove(&connection) else {
            debug!("Close of unknown {}, ignoring", connection);
            return Ok(());
        };

        link.stop_notifier();
        if link.peripheral.is_connected().await.unwrap_or(false) {
            link.peripheral.disconnect().await?;
        }
        info!("Closed {}", connection);
        Ok(())
    }

    /// Close every link
    pub(crate) async fn close_all(&self) {
        let connections: Vec<ConnectionHandle> = self.links.read().await.keys().copied().collect();
        for connection in connections {
            if let Err(e) = self.close(connection).await {
                error!("Failed to close {}: {}", connection, e);
            }
        }
    }

    /// Run service discovery and look for `service`
    pub(crate) async fn discover_service(
        &self,
        connection: ConnectionHandle,
        service: Uuid,
    ) -> BleAdapterResult<Option<ServiceHandle>> {
        let peripheral = self.peripheral(connection).await?;
        peripheral.discover_services().await?;

        let found = peripheral.services().iter().any(|s| s.uuid == service);
        debug!("Service {} on {}: {}", service, connection, found);
        Ok(found.then_some(ServiceHandle {
            connection,
            uuid: service,
        }))
    }

    /// Look for `characteristic` within an already discovered service
    pub(crate) async fn discover_characteristic(
        &self,
        service: &ServiceHandle,
        characteristic: Uuid,
    ) -> BleAdapterResult<Option<CharacteristicHandle>> {
        let peripheral = self.peripheral(service.connection).await?;
        let found =
            find_characteristic(&peripheral.characteristics(), service.uuid, characteristic)
                .is_some();
        Ok(found.then(|| CharacteristicHandle::new(service, characteristic)))
    }

    /// Subscribe and start forwarding notifications for `handle`
    ///
    /// btleplug's `subscribe` writes the enable value to the CCCD itself, so
    /// the descriptor is only checked, never written directly.
    pub(crate) async fn enable_notifications(
        &self,
        handle: &CharacteristicHandle,
        descriptor: Uuid,
    ) -> BleAdapterResult<()> {
        if descriptor != CLIENT_CHARACTERISTIC_CONFIG_UUID {
            return Err(BleAdapterError::UnsupportedDescriptor {
                descriptor: descriptor.to_string(),
            });
        }

        let (peripheral, characteristic) = self.resolve(handle).await?;
        peripheral.subscribe(&characteristic).await?;

        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|e| BleAdapterError::NotificationStreamFailed(e.to_string()))?;

        let events = self.events.clone();
        let target = handle.clone();
        let notifier = tokio::spawn(async move {
            while let Some(data) = notifications.next().await {
                if data.uuid != target.uuid {
                    continue;
                }
                let event = AdapterEvent::ValueChanged {
                    characteristic: target.clone(),
                    value: data.value,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            debug!("Notification forwarder for {} ended", target.connection);
        });

        attach_notifier(&self.links, handle.connection, notifier).await?;
        debug!("Subscribed to {} on {}", handle.uuid, handle.connection);
        Ok(())
    }

    pub(crate) async fn read(&self, handle: &CharacteristicHandle) -> BleAdapterResult<Vec<u8>> {
        let (peripheral, characteristic) = self.resolve(handle).await?;
        let value = peripheral.read(&characteristic).await?;
        debug!("Read {} bytes from {}", value.len(), handle.connection);
        Ok(value)
    }

    pub(crate) async fn write(&self, handle: &CharacteristicHandle, payload: &[u8]) -> BleAdapterResult<()> {
        let (peripheral, characteristic) = self.resolve(handle).await?;
        peripheral
            .write(&characteristic, payload, WriteType::WithResponse)
            .await?;
        debug!("Wrote {} bytes to {}", payload.len(), handle.connection);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn peripheral(&self, connection: ConnectionHandle) -> BleAdapterResult<Peripheral> {
        self.links
            .read()
            .await
            .get(&connection)
            .map(|link| link.peripheral.clone())
            .ok_or_else(|| BleAdapterError::UnknownConnection(connection.to_string()))
    }

    /// Clone out the peripheral and characteristic so no lock is held during I/O
    async fn resolve(
        &self,
        handle: &CharacteristicHandle,
    ) -> BleAdapterResult<(Peripheral, btleplug::api::Characteristic)> {
        let links = self.links.read().await;
        let link = links
            .get(&handle.connection)
            .ok_or_else(|| BleAdapterError::UnknownConnection(handle.connection.to_string()))?;
        Ok((link.peripheral.clone(), link.characteristic(handle)?))
    }
}

/// Hand a notification forwarder to its link
///
/// The link may have been closed while subscribing, in which case the
/// forwarder is stopped.
async fn attach_notifier(
    links: &RwLock<HashMap<ConnectionHandle, BleLink>>,
    connection: ConnectionHandle,
    notifier: JoinHandle<()>,
) -> BleAdapterResult<()> {
    match links.write().await.get_mut(&connection) {
        Some(link) => {
            link.set_notifier(notifier);
            Ok(())
        }
        None => {
            notifier.abort();
            Err(BleAdapterError::UnknownConnection(connection.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_notifier_for_closed_link_is_stopped() {
        let links = RwLock::new(HashMap::new());
        let (alive, stopped) = oneshot::channel::<()>();
        let notifier = tokio::spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        });

        let result = attach_notifier(&links, ConnectionHandle::new(3), notifier).await;

        assert!(matches!(result, Err(BleAdapterError::UnknownConnection(_))));
        // Aborting drops the task's sender
        assert!(stopped.await.is_err());
    }
}
