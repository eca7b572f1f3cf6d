//! Asynchronous service and characteristic lookup

use blebridge_core::{BleAdapter, ConnectionHandle, Resolution};
use tracing::debug;
use uuid::Uuid;

/// Look up `service` on the link, then `characteristic` inside it
///
/// Never fails outright: missing pieces and adapter errors are folded into the
/// returned [`Resolution`] for the state machine to interpret.
pub async fn resolve_value_characteristic(
    adapter: &dyn BleAdapter,
    connection: ConnectionHandle,
    service: Uuid,
    characteristic: Uuid,
) -> Resolution {
    let service = match adapter.discover_service(connection, service).await {
        Ok(Some(service)) => service,
        Ok(None) => {
            debug!("Service {} not present on {}", service, connection);
            return Resolution::ServiceMissing;
        }
        Err(err) => return Resolution::Failed(err),
    };

    match adapter.discover_characteristic(&service, characteristic).await {
        Ok(Some(handle)) => Resolution::Found(handle),
        Ok(None) => {
            debug!("Characteristic {} not present in {}", characteristic, service.uuid);
            Resolution::CharacteristicMissing
        }
        Err(err) => Resolution::Failed(err),
    }
}
