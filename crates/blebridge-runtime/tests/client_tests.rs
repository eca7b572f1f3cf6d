//! Integration Tests for BleBridgeClient
//!
//! Runs the full client (bridge task, effect worker, scan timer) against a
//! recording `MockAdapter`. Time is paused so the scan window elapses
//! instantly when the runtime is otherwise idle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blebridge_core::{
    AdapterError, AdapterEvent, AdapterEventStream, BleAdapter, BridgeConfig,
    CharacteristicHandle, ConnectionHandle, ConnectionState, PeripheralHandle, ServiceHandle,
    Severity, StatusSnapshot, CLIENT_CHARACTERISTIC_CONFIG_UUID, VALUE_CHARACTERISTIC_UUID,
    VALUE_SERVICE_UUID,
};
use blebridge_runtime::{BleBridgeClient, RuntimeError};
use futures::channel::mpsc;
use tokio::time::{timeout, Instant};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Mock Adapter
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Call {
    StartScan(Uuid),
    StopScan,
    Connect(String),
    Close(ConnectionHandle),
    DiscoverService(Uuid),
    DiscoverCharacteristic(Uuid),
    EnableNotifications(Uuid),
    Read,
    Write(Vec<u8>),
}

struct MockAdapter {
    granted: bool,
    advertise: bool,
    has_characteristic: bool,
    connect_delay: Duration,
    value: Mutex<Vec<u8>>,
    calls: Mutex<Vec<Call>>,
    sender: mpsc::UnboundedSender<AdapterEvent>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<AdapterEvent>>>,
}

impl MockAdapter {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            granted: true,
            advertise: true,
            has_characteristic: true,
            connect_delay: Duration::ZERO,
            value: Mutex::new(vec![42, 0, 0, 0]),
            calls: Mutex::new(Vec::new()),
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    fn without_capability(mut self) -> Self {
        self.granted = false;
        self
    }

    fn silent(mut self) -> Self {
        self.advertise = false;
        self
    }

    fn without_characteristic(mut self) -> Self {
        self.has_characteristic = false;
        self
    }

    /// Links take `delay` to come up
    fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    fn push(&self, event: AdapterEvent) {
        self.sender
            .unbounded_send(event)
            .expect("event stream should be open");
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn was_called(&self, call: &Call) -> bool {
        self.calls().contains(call)
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl BleAdapter for MockAdapter {
    async fn scan_capability_granted(&self) -> bool {
        self.granted
    }

    async fn events(&self) -> Result<AdapterEventStream, AdapterError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or(AdapterError::Unavailable)?;
        Ok(Box::pin(receiver))
    }

    async fn start_scan(&self, service: Uuid) -> Result<(), AdapterError> {
        self.record(Call::StartScan(service));
        if self.advertise {
            self.push(AdapterEvent::Discovered(create_test_peripheral()));
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), AdapterError> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, peripheral: &PeripheralHandle) -> Result<ConnectionHandle, AdapterError> {
        self.record(Call::Connect(peripheral.id().to_string()));
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        Ok(ConnectionHandle::new(1))
    }

    async fn close_connection(&self, connection: ConnectionHandle) -> Result<(), AdapterError> {
        self.record(Call::Close(connection));
        Ok(())
    }

    async fn discover_service(
        &self,
        connection: ConnectionHandle,
        service: Uuid,
    ) -> Result<Option<ServiceHandle>, AdapterError> {
        self.record(Call::DiscoverService(service));
        Ok(Some(ServiceHandle {
            connection,
            uuid: service,
        }))
    }

    async fn discover_characteristic(
        &self,
        service: &ServiceHandle,
        characteristic: Uuid,
    ) -> Result<Option<CharacteristicHandle>, AdapterError> {
        self.record(Call::DiscoverCharacteristic(characteristic));
        if !self.has_characteristic {
            return Ok(None);
        }
        Ok(Some(CharacteristicHandle::new(service, characteristic)))
    }

    async fn enable_notifications(
        &self,
        _characteristic: &CharacteristicHandle,
        descriptor: Uuid,
    ) -> Result<(), AdapterError> {
        self.record(Call::EnableNotifications(descriptor));
        Ok(())
    }

    async fn read_characteristic(
        &self,
        _characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, AdapterError> {
        self.record(Call::Read);
        Ok(self.value.lock().unwrap().clone())
    }

    async fn write_characteristic(
        &self,
        _characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        self.record(Call::Write(payload.to_vec()));
        *self.value.lock().unwrap() = payload.to_vec();
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn create_test_peripheral() -> PeripheralHandle {
    PeripheralHandle::new("24:6F:28:AA:BB:CC", Some("BLE-Memory-Bridge".to_string()))
}

async fn spawn_client(adapter: &Arc<MockAdapter>) -> BleBridgeClient {
    BleBridgeClient::spawn(adapter.clone(), BridgeConfig::default())
        .await
        .expect("client should start")
}

async fn wait_until(
    client: &BleBridgeClient,
    predicate: impl FnMut(&StatusSnapshot) -> bool,
) -> StatusSnapshot {
    let mut receiver = client.subscribe();
    let snapshot = timeout(Duration::from_secs(30), receiver.wait_for(predicate))
        .await
        .expect("snapshot condition should be reached")
        .expect("client should still be running");
    snapshot.clone()
}

async fn wait_for_call(adapter: &MockAdapter, call: Call) {
    timeout(Duration::from_secs(30), async {
        while !adapter.was_called(&call) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("adapter call should happen");
}

async fn wait_for_count(adapter: &MockAdapter, call: Call, count: usize) {
    timeout(Duration::from_secs(30), async {
        while adapter.count(&call) < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("adapter calls should happen");
}

/// Client connected, subscribed and holding the initial value
async fn ready_client(adapter: &Arc<MockAdapter>) -> BleBridgeClient {
    let client = spawn_client(adapter).await;
    client.start_scan().await;
    wait_until(&client, |s| s.ready && s.value.is_some()).await;
    client
}

// ----------------------------------------------------------------------------
// Connection Lifecycle
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_initial_snapshot() {
    let adapter = Arc::new(MockAdapter::new());
    let client = spawn_client(&adapter).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert_eq!(snapshot.status, "Waiting for Bluetooth...");
    assert_eq!(snapshot.value_label(), "No value yet");
    assert!(client.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_scan_connects_subscribes_and_reads() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.value, Some(42));
    assert_eq!(snapshot.severity, Severity::Ok);

    let calls = adapter.calls();
    assert_eq!(calls[0], Call::StartScan(VALUE_SERVICE_UUID));
    assert_eq!(calls[1], Call::StopScan);
    assert_eq!(calls[2], Call::Connect("24:6F:28:AA:BB:CC".to_string()));
    assert!(calls.contains(&Call::EnableNotifications(
        CLIENT_CHARACTERISTIC_CONFIG_UUID
    )));
    assert!(calls.contains(&Call::Read));
    // The scan is never restarted after the match
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::StartScan(_)))
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_scan_times_out_to_idle() {
    let adapter = Arc::new(MockAdapter::new().silent());
    let client = spawn_client(&adapter).await;

    client.start_scan().await;
    let snapshot = wait_until(&client, |s| s.status == "Scan ended, no device found").await;
    assert_eq!(snapshot.state, ConnectionState::Idle);

    wait_for_call(&adapter, Call::StopScan).await;
    assert!(!adapter
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Connect(_))));
}

#[tokio::test(start_paused = true)]
async fn test_capability_denied_never_scans() {
    let adapter = Arc::new(MockAdapter::new().without_capability());
    let client = spawn_client(&adapter).await;

    client.start_scan().await;
    let snapshot =
        wait_until(&client, |s| s.status == "Bluetooth permissions are required").await;

    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert_eq!(snapshot.severity, Severity::Error);
    assert!(adapter.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_characteristic_stays_connected() {
    let adapter = Arc::new(MockAdapter::new().without_characteristic());
    let client = spawn_client(&adapter).await;

    client.start_scan().await;
    let snapshot = wait_until(&client, |s| s.status == "Characteristic not found").await;
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert!(!snapshot.ready);

    client.read_value().await;
    let snapshot = wait_until(&client, |s| s.status == "Not connected").await;
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert!(!adapter.was_called(&Call::Read));
}

#[tokio::test(start_paused = true)]
async fn test_peer_disconnect_releases_link() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    adapter.push(AdapterEvent::Disconnected {
        connection: ConnectionHandle::new(1),
        reason: Some("peer closed".to_string()),
    });

    let snapshot = wait_until(&client, |s| s.state == ConnectionState::Disconnected).await;
    assert_eq!(snapshot.value, None);
    assert!(!snapshot.ready);
    wait_for_call(&adapter, Call::Close(ConnectionHandle::new(1))).await;
}

#[tokio::test(start_paused = true)]
async fn test_rescan_does_not_wait_for_abandoned_connect() {
    let adapter = Arc::new(
        MockAdapter::new()
            .silent()
            .with_connect_delay(Duration::from_secs(5)),
    );
    let client = spawn_client(&adapter).await;

    client.start_scan().await;
    wait_for_call(&adapter, Call::StartScan(VALUE_SERVICE_UUID)).await;
    adapter.push(AdapterEvent::Discovered(create_test_peripheral()));
    wait_for_call(&adapter, Call::Connect("24:6F:28:AA:BB:CC".to_string())).await;

    client.disconnect().await;
    client.start_scan().await;
    let requested = Instant::now();

    // The radio starts scanning while the old attempt is still connecting
    wait_for_count(&adapter, Call::StartScan(VALUE_SERVICE_UUID), 2).await;
    assert!(requested.elapsed() < Duration::from_secs(1));

    // The late link is closed and the new scan keeps running
    wait_for_call(&adapter, Call::Close(ConnectionHandle::new(1))).await;
    assert_eq!(client.snapshot().state, ConnectionState::Scanning);

    let snapshot = wait_until(&client, |s| s.status == "Scan ended, no device found").await;
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert!(requested.elapsed() >= Duration::from_secs(10));
}

// ----------------------------------------------------------------------------
// Value Transfer
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_write_hex_then_notification() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    client.write_value("0xFF").await;
    wait_until(&client, |s| s.status == "Write succeeded: 255").await;
    assert!(adapter.was_called(&Call::Write(vec![0xFF, 0x00, 0x00, 0x00])));
    // The write alone does not change the sample
    assert_eq!(client.snapshot().value, Some(42));

    let characteristic = CharacteristicHandle::new(
        &ServiceHandle {
            connection: ConnectionHandle::new(1),
            uuid: VALUE_SERVICE_UUID,
        },
        VALUE_CHARACTERISTIC_UUID,
    );
    adapter.push(AdapterEvent::ValueChanged {
        characteristic,
        value: vec![0xFF, 0x00, 0x00, 0x00],
    });

    let snapshot = wait_until(&client, |s| s.value == Some(255)).await;
    assert_eq!(snapshot.status, "Notification: 255");
}

#[tokio::test(start_paused = true)]
async fn test_write_input_then_read_back() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    client.set_input("  7 ").await;
    client.write_input().await;
    wait_until(&client, |s| s.status == "Write succeeded: 7").await;
    assert_eq!(client.snapshot().input, "  7 ");

    client.read_value().await;
    let snapshot = wait_until(&client, |s| s.value == Some(7)).await;
    assert_eq!(snapshot.status, "Value: 7");
    assert_eq!(snapshot.value_label(), "Last value: 7");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_write_performs_no_io() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    client.write_value("abc").await;
    let snapshot = wait_until(&client, |s| s.status == "Invalid number").await;

    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert!(!adapter
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Write(_))));
}

// ----------------------------------------------------------------------------
// Teardown
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_disconnect_is_idempotent() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    client.disconnect().await;
    client.disconnect().await;
    let snapshot = wait_until(&client, |s| s.state == ConnectionState::Disconnected).await;
    assert_eq!(snapshot.status, "Disconnected");
    assert_eq!(snapshot.value, None);

    wait_for_call(&adapter, Call::Close(ConnectionHandle::new(1))).await;
    let closes = adapter
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Close(_)))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_link_before_returning() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;
    let observer = client.clone();

    client.shutdown().await;

    assert!(adapter.was_called(&Call::Close(ConnectionHandle::new(1))));
    assert!(!observer.is_running());
    assert_eq!(observer.snapshot().state, ConnectionState::Disconnected);

    // Operations on a stopped client are ignored
    observer.start_scan().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_connect_closes_late_link() {
    let adapter = Arc::new(
        MockAdapter::new()
            .silent()
            .with_connect_delay(Duration::from_secs(5)),
    );
    let client = spawn_client(&adapter).await;

    client.start_scan().await;
    wait_for_call(&adapter, Call::StartScan(VALUE_SERVICE_UUID)).await;
    adapter.push(AdapterEvent::Discovered(create_test_peripheral()));
    wait_for_call(&adapter, Call::Connect("24:6F:28:AA:BB:CC".to_string())).await;

    client.shutdown().await;

    assert!(adapter.was_called(&Call::Close(ConnectionHandle::new(1))));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_tears_down() {
    let adapter = Arc::new(MockAdapter::new());
    let client = ready_client(&adapter).await;

    drop(client);
    wait_for_call(&adapter, Call::Close(ConnectionHandle::new(1))).await;
}

#[tokio::test(start_paused = true)]
async fn test_spawn_fails_without_event_stream() {
    let adapter = Arc::new(MockAdapter::new());
    let _first = spawn_client(&adapter).await;

    let second = BleBridgeClient::spawn(adapter.clone(), BridgeConfig::default()).await;
    assert_eq!(
        second.err(),
        Some(RuntimeError::EventStream(AdapterError::Unavailable))
    );
}
