//! Error types for astrid-scheduler.

use astrid_core::Buffer;
use thiserror::Error;

/// Error type for scheduler operations.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The lock-free schedule inbox is full. The buffer comes back so the
    /// caller can retry with backoff instead of losing the render.
    #[error("Schedule inbox full")]
    InboxFull(Buffer),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, SchedulerError>;
