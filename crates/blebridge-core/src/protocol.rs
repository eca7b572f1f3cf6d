//! Wire protocol constants shared with the ESP32 firmware
//!
//! These values must match the peripheral bit for bit.

use std::time::Duration;

use uuid::Uuid;

// ----------------------------------------------------------------------------
// GATT UUIDs
// ----------------------------------------------------------------------------

/// Custom service exposed by the ESP32 value bridge
pub const VALUE_SERVICE_UUID: Uuid = Uuid::from_u128(0xd973f2b9_2ed7_4d5b_ad07_4d1974f2c925);

/// Read/write/notify characteristic holding the 32-bit value
pub const VALUE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xd973f2b9_2ed7_4d5b_ad07_4d1974f2c926);

/// Standard Client Characteristic Configuration Descriptor
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid =
    Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

// ----------------------------------------------------------------------------
// Payload and Timing
// ----------------------------------------------------------------------------

/// Size of the little-endian u32 payload
pub const VALUE_PAYLOAD_LEN: usize = 4;

/// Fixed scan window before giving up on finding a peripheral
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Display name used when an advertisement carries no local name
pub const DEFAULT_PERIPHERAL_NAME: &str = "ESP32";
