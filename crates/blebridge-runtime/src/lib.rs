//! BLE Bridge Runtime
//!
//! This crate runs the `BridgeMachine` from `blebridge-core` against a real
//! `BleAdapter`:
//! - `BleBridgeClient`: the handle front-ends hold; sends commands, observes snapshots
//! - `BridgeTask`: the single task that owns the machine and serializes every mutation
//! - Effect worker: executes adapter effects in order and reports completions
//! - Scan timer: the one cancelable deadline
//!
//! The machine decides, this crate only carries messages between it and the
//! adapter.

mod client;
mod error;
mod executor;
mod resolver;
mod task;
mod timer;

pub use client::BleBridgeClient;
pub use error::{RuntimeError, RuntimeResult};
pub use resolver::resolve_value_characteristic;

// Re-export core types for convenience
pub use blebridge_core::{
    BleAdapter, BridgeConfig, Command, ConnectionState, Severity, StatusSnapshot,
};
