//! Live link bookkeeping

use blebridge_core::{CharacteristicHandle, ConnectionHandle};
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::{Peripheral, PeripheralId};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{BleAdapterError, BleAdapterResult};

/// A connected peripheral and the tasks attached to it
#[derive(Debug)]
pub struct BleLink {
    pub connection: ConnectionHandle,
    pub peripheral: Peripheral,
    /// Forwards notifications once they are enabled
    notifier: Option<JoinHandle<()>>,
}

impl BleLink {
    pub fn new(connection: ConnectionHandle, peripheral: Peripheral) -> Self {
        Self {
            connection,
            peripheral,
            notifier: None,
        }
    }

    /// Get peripheral ID for comparison with central events
    pub fn peripheral_id(&self) -> PeripheralId {
        self.peripheral.id()
    }

    /// Find the btleplug characteristic behind a handle
    pub fn characteristic(&self, handle: &CharacteristicHandle) -> BleAdapterResult<Characteristic> {
        find_characteristic(&self.peripheral.characteristics(), handle.service, handle.uuid)
            .ok_or_else(|| BleAdapterError::CharacteristicNotFound {
                characteristic: handle.uuid.to_string(),
            })
    }

    /// Attach the notification forwarder, replacing any previous one
    pub fn set_notifier(&mut self, notifier: JoinHandle<()>) {
        self.stop_notifier();
        self.notifier = Some(notifier);
    }

    pub fn stop_notifier(&mut self) {
        if let Some(notifier) = self.notifier.take() {
            notifier.abort();
        }
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        self.stop_notifier();
    }
}

/// Look up a characteristic by service and characteristic UUID
pub fn find_characteristic<'a>(
    characteristics: impl IntoIterator<Item = &'a Characteristic>,
    service: Uuid,
    uuid: Uuid,
) -> Option<Characteristic> {
    characteristics
        .into_iter()
        .find(|c| c.service_uuid == service && c.uuid == uuid)
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use btleplug::api::CharPropFlags;

    use super::*;

    fn characteristic(service: u128, uuid: u128) -> Characteristic {
        Characteristic {
            uuid: Uuid::from_u128(uuid),
            service_uuid: Uuid::from_u128(service),
            properties: CharPropFlags::READ | CharPropFlags::WRITE | CharPropFlags::NOTIFY,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_lookup_requires_matching_service() {
        let set = vec![characteristic(1, 10), characteristic(2, 10)];

        let found = find_characteristic(&set, Uuid::from_u128(2), Uuid::from_u128(10));
        assert_eq!(found.map(|c| c.service_uuid), Some(Uuid::from_u128(2)));
        assert!(find_characteristic(&set, Uuid::from_u128(3), Uuid::from_u128(10)).is_none());
    }
}
