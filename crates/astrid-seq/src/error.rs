//! Error types for astrid-seq.

use thiserror::Error;

/// Error type for sequencer operations.
#[derive(Error, Debug)]
pub enum SeqError {
    #[error("Transport: {0}")]
    Ipc(#[from] astrid_ipc::IpcError),

    #[error("Bad message: {0}")]
    Message(#[from] astrid_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker thread panicked")]
    WorkerPanic,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SeqError>;
