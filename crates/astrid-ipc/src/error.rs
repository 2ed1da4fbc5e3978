//! Error types for astrid-ipc.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for IPC operations.
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Transport full")]
    TransportFull,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Bad message: {0}")]
    BadMessage(#[from] astrid_core::Error),

    #[error("Lock timeout on {0}")]
    LockTimeout(String),

    #[error("Shared memory exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Interrupted")]
    Interrupted,

    #[error("Read of {requested} samples exceeds ring capacity {capacity}")]
    WindowTooLarge { requested: usize, capacity: usize },

    #[error("Semaphore {name}: {source}")]
    Sem {
        name: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, IpcError>;
