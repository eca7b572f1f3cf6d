//! BLE Bridge Core
//!
//! This crate holds everything about the ESP32 value bridge that does not touch
//! a radio: the wire constants shared with the peripheral firmware, the value
//! codec, the error taxonomy, and the `BridgeMachine` state machine that turns
//! user commands and adapter events into adapter effects.
//!
//! ## Architecture
//!
//! - [`protocol`] - UUIDs and fixed protocol constants
//! - [`codec`] - ValueChannel encode/decode and the user input grammar
//! - [`errors`] - Error types surfaced as status lines
//! - [`handles`] - Opaque peripheral, connection and characteristic handles
//! - [`adapter`] - The `BleAdapter` capability trait a platform stack implements
//! - [`messages`] - Command / Event / Effect channel types
//! - [`scanner`], [`connection`], [`resolver`], [`channel`] - Components owned by the machine
//! - [`machine`] - The serialized state machine
//! - [`state`] - Connection states and the immutable `StatusSnapshot`
//!
//! The machine is synchronous and never blocks. Every entry point returns the
//! effects the caller must execute, and completions come back later as events.
//! `blebridge-runtime` provides the task that does this.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod adapter;
pub mod channel;
pub mod codec;
pub mod config;
pub mod connection;
pub mod errors;
pub mod handles;
pub mod machine;
pub mod messages;
pub mod protocol;
pub mod resolver;
pub mod scanner;
pub mod state;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use adapter::{AdapterEvent, AdapterEventStream, BleAdapter};
pub use codec::{decode_value, encode_value, parse_input};
pub use config::BridgeConfig;
pub use errors::{AdapterError, BridgeError, DecodeError, IoOperation, ParseError};
pub use handles::{CharacteristicHandle, ConnectionHandle, PeripheralHandle, ServiceHandle};
pub use machine::BridgeMachine;
pub use messages::{Command, Effect, Event};
pub use protocol::{
    CLIENT_CHARACTERISTIC_CONFIG_UUID, SCAN_TIMEOUT,
    VALUE_CHARACTERISTIC_UUID, VALUE_PAYLOAD_LEN, VALUE_SERVICE_UUID,
};
pub use resolver::Resolution;
pub use state::{project, ConnectionState, Severity, StatusSnapshot};
