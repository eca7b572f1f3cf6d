//! Scanning and central event translation
//!
//! btleplug reports every advertisement the host sees. While a scan is active
//! this module keeps the peripherals that advertise the wanted service and
//! forwards them as `Discovered`. Disconnects of owned links and radio power
//! changes are forwarded whether or not a scan is running.

use std::collections::HashMap;
use std::sync::Arc;

use blebridge_core::{AdapterEvent, ConnectionHandle, PeripheralHandle};
use btleplug::api::{Central, CentralEvent, CentralState, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::BleAdapterResult;
use crate::link::BleLink;

// ----------------------------------------------------------------------------
// Discovery Implementation
// ----------------------------------------------------------------------------

/// State shared between the adapter and its central event pump
pub(crate) struct BleDiscovery {
    adapter: Adapter,
    /// Service being scanned for; `None` when no scan is active
    scan_service: RwLock<Option<Uuid>>,
    /// Peripherals seen during scans, keyed by platform id string
    discovered: RwLock<HashMap<String, Peripheral>>,
    events: mpsc::UnboundedSender<AdapterEvent>,
}

impl BleDiscovery {
    pub(crate) fn new(adapter: Adapter, events: mpsc::UnboundedSender<AdapterEvent>) -> Self {
        Self {
            adapter,
            scan_service: RwLock::new(None),
            discovered: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub(crate) fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Start a scan filtered on `service`
    pub(crate) async fn start_scanning(&self, service: Uuid) -> BleAdapterResult<()> {
        *self.scan_service.write().await = Some(service);

        let scan_filter = ScanFilter {
            services: vec![service],
        };
        if let Err(err) = self.adapter.start_scan(scan_filter).await {
            *self.scan_service.write().await = None;
            return Err(err.into());
        }

        info!("Started BLE scanning for service {}", service);
        Ok(())
    }

    /// Stop scanning
    pub(crate) async fn stop_scanning(&self) -> BleAdapterResult<()> {
        if self.scan_service.write().await.take().is_none() {
            return Ok(());
        }
        self.adapter.stop_scan().await?;
        debug!("Stopped BLE scanning");
        Ok(())
    }

    /// Peripheral recorded for a handle id
    pub(crate) async fn peripheral(&self, id: &str) -> Option<Peripheral> {
        self.discovered.read().await.get(id).cloned()
    }

    /// Translate central events until the btleplug stream ends
    pub(crate) async fn run_event_pump(
        self: Arc<Self>,
        links: Arc<RwLock<HashMap<ConnectionHandle, BleLink>>>,
    ) {
        let mut central_events = match self.adapter.events().await {
            Ok(events) => events,
            Err(err) => {
                warn!("Failed to get BLE events: {}", err);
                return;
            }
        };

        while let Some(event) = central_events.next().await {
            if let Some(event) = self.process_central_event(event, &links).await {
                if self.events.send(event).is_err() {
                    debug!("Adapter event receiver dropped, stopping event pump");
                    break;
                }
            }
        }
        debug!("Central event pump ended");
    }

    async fn process_central_event(
        &self,
        event: CentralEvent,
        links: &RwLock<HashMap<ConnectionHandle, BleLink>>,
    ) -> Option<AdapterEvent> {
        match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ServicesAdvertisement { id, .. } => self.process_advertisement(id).await,
            CentralEvent::DeviceDisconnected(id) => {
                let links = links.read().await;
                let link = links.values().find(|link| link.peripheral_id() == id)?;
                debug!("Peripheral {} disconnected", id);
                Some(AdapterEvent::Disconnected {
                    connection: link.connection,
                    reason: None,
                })
            }
            CentralEvent::StateUpdate(state) => {
                let powered = matches!(state, CentralState::PoweredOn);
                info!("BLE adapter state changed: {:?}", state);
                Some(AdapterEvent::PoweredChanged { powered })
            }
            _ => None,
        }
    }

    async fn process_advertisement(&self, id: PeripheralId) -> Option<AdapterEvent> {
        let service = (*self.scan_service.read().await)?;

        let peripheral = self.adapter.peripheral(&id).await.ok()?;
        let properties = peripheral.properties().await.ok().flatten()?;
        if !advertises_service(&properties.services, service) {
            return None;
        }

        let handle = PeripheralHandle::new(peripheral.id().to_string(), properties.local_name);
        let mut discovered = self.discovered.write().await;
        if !discovered.contains_key(handle.id()) {
            debug!("Discovered peripheral {}", handle);
        }
        discovered.insert(handle.id().to_string(), peripheral);
        Some(AdapterEvent::Discovered(handle))
    }
}

/// Whether an advertisement's service list carries `service`
pub fn advertises_service(services: &[Uuid], service: Uuid) -> bool {
    services.contains(&service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blebridge_core::VALUE_SERVICE_UUID;

    #[test]
    fn test_service_filter() {
        let other = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
        assert!(advertises_service(&[other, VALUE_SERVICE_UUID], VALUE_SERVICE_UUID));
        assert!(!advertises_service(&[other], VALUE_SERVICE_UUID));
        assert!(!advertises_service(&[], VALUE_SERVICE_UUID));
    }
}
