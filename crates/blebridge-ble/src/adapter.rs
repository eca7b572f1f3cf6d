//! Main btleplug adapter implementation

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blebridge_core::{
    AdapterError, AdapterEvent, AdapterEventStream, BleAdapter, CharacteristicHandle,
    ConnectionHandle, PeripheralHandle, ServiceHandle,
};
use btleplug::api::{Central, Manager as _};
use btleplug::platform::Manager;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BtleplugConfig;
use crate::connection::BleConnection;
use crate::discovery::BleDiscovery;
use crate::error::{BleAdapterError, BleAdapterResult};

// ----------------------------------------------------------------------------
// Adapter Implementation
// ----------------------------------------------------------------------------

/// `BleAdapter` backed by the host's Bluetooth stack through btleplug
pub struct BtleplugAdapter {
    discovery: Arc<BleDiscovery>,
    connection: BleConnection,
    /// Receiving half of the adapter event channel, taken by `events()`
    receiver: Mutex<Option<mpsc::UnboundedReceiver<AdapterEvent>>>,
}

impl BtleplugAdapter {
    /// Open the host adapter selected by `config`
    pub async fn new(config: BtleplugConfig) -> BleAdapterResult<Self> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleAdapterError::ManagerFailed(e.to_string()))?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleAdapterError::AdapterNotAvailable)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("BLE adapter initialized: {}", info),
            Err(e) => warn!("BLE adapter initialized, info unavailable: {}", e),
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(Self {
            discovery: Arc::new(BleDiscovery::new(adapter, sender.clone())),
            connection: BleConnection::new(config, sender),
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// Close every link and stop scanning
    pub async fn shutdown(&self) {
        if let Err(e) = self.discovery.stop_scanning().await {
            warn!("Failed to stop scan during shutdown: {}", e);
        }
        self.connection.close_all().await;
    }
}

#[async_trait]
impl BleAdapter for BtleplugAdapter {
    async fn scan_capability_granted(&self) -> bool {
        // Without permission the platform refuses to describe the adapter
        self.discovery.adapter().adapter_info().await.is_ok()
    }

    async fn events(&self) -> Result<AdapterEventStream, AdapterError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| AdapterError::Platform("event receiver lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| AdapterError::from(BleAdapterError::EventStreamTaken))?;

        tokio::spawn(
            Arc::clone(&self.discovery).run_event_pump(self.connection.links()),
        );

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        });
        Ok(Box::pin(stream))
    }

    async fn start_scan(&self, service: Uuid) -> Result<(), AdapterError> {
        self.discovery
            .start_scanning(service)
            .await
            .map_err(|e| AdapterError::NotStarted(e.to_string()))
    }

    async fn stop_scan(&self) -> Result<(), AdapterError> {
        Ok(self.discovery.stop_scanning().await?)
    }

    async fn connect(&self, peripheral: &PeripheralHandle) -> Result<ConnectionHandle, AdapterError> {
        let platform = self
            .discovery
            .peripheral(peripheral.id())
            .await
            .ok_or_else(|| BleAdapterError::PeripheralNotDiscovered(peripheral.id().to_string()))?;
        debug!("Connecting to {}", peripheral);
        Ok(self.connection.connect(platform).await?)
    }

    async fn close_connection(&self, connection: ConnectionHandle) -> Result<(), AdapterError> {
        Ok(self.connection.close(connection).await?)
    }

    async fn discover_service(
        &self,
        connection: ConnectionHandle,
        service: Uuid,
    ) -> Result<Option<ServiceHandle>, AdapterError> {
        Ok(self.connection.discover_service(connection, service).await?)
    }

    async fn discover_characteristic(
        &self,
        service: &ServiceHandle,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicHandle>, AdapterError> {
        Ok(self
            .connection
            .discover_characteristic(service, characteristic)
            .await?)
    }

    async fn enable_notifications(
        &self,
        characteristic: &CharacteristicHandle,
        descriptor: Uuid,
    ) -> Result<(), AdapterError> {
        Ok(self
            .connection
            .enable_notifications(characteristic, descriptor)
            .await?)
    }

    async fn read_characteristic(
        &self,
        characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, AdapterError> {
        Ok(self.connection.read(characteristic).await?)
    }

    async fn write_characteristic(
        &self,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        Ok(self.connection.write(characteristic, payload).await?)
    }
}
