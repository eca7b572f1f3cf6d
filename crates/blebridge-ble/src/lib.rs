//! btleplug adapter for the ESP32 value bridge
//!
//! This crate provides [`BtleplugAdapter`], a `BleAdapter` from
//! `blebridge-core` backed by the host Bluetooth stack (BlueZ, CoreBluetooth or
//! WinRT) through `btleplug`.
//!
//! ## Architecture
//!
//! - [`config`] - Adapter configuration
//! - [`error`] - Error types and their mapping onto `AdapterError`
//! - [`discovery`] - Scanning and central event translation
//! - [`connection`] - Link management and characteristic I/O
//! - [`link`] - Per-link state
//! - [`adapter`] - The `BleAdapter` implementation tying them together
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use blebridge_ble::{BtleplugAdapter, BtleplugConfig};
//! use blebridge_runtime::{BleBridgeClient, BridgeConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = Arc::new(BtleplugAdapter::new(BtleplugConfig::default()).await?);
//! let client = BleBridgeClient::spawn(adapter, BridgeConfig::default()).await?;
//!
//! client.start_scan().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Notifications
//!
//! btleplug's `subscribe` writes the enable value to the Client Characteristic
//! Configuration descriptor on every platform, so the per-OS enablement paths
//! live inside btleplug rather than here.

mod adapter;
mod config;
mod connection;
mod discovery;
mod error;
mod link;

pub use adapter::BtleplugAdapter;
pub use config::BtleplugConfig;
pub use discovery::advertises_service;
pub use error::{BleAdapterError, BleAdapterResult};
pub use link::find_characteristic;
