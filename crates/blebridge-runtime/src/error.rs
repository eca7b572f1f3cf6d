//! Runtime errors
//!
//! These only concern the client plumbing. Bridge failures never surface here;
//! they become status lines in the snapshot.

use blebridge_core::AdapterError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Adapter event stream unavailable: {0}")]
    EventStream(#[source] AdapterError),

    #[error("Bridge task has stopped")]
    TaskStopped,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
