//! Error types for astrid-core.

use thiserror::Error;

/// Error type for astrid-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Short record: expected {expected} bytes, got {got}")]
    ShortRecord { expected: usize, got: usize },

    #[error("Bad message discriminant: {0}")]
    BadDiscriminant(u8),

    #[error("Bad message type character: {0:?}")]
    BadTypeChar(char),

    #[error("Invalid instrument name: {0:?}")]
    BadInstrumentName(String),

    #[error("{field} is {len} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Unterminated {0} field in message record")]
    UnterminatedField(&'static str),

    #[error("{0} contains non-ASCII bytes")]
    NonAsciiField(&'static str),

    #[error("Stop message requires a voice id argument")]
    MissingVoiceId,

    #[error("Invalid voice id: {0:?}")]
    BadVoiceId(String),

    #[error("Buffer payload truncated: header says {expected} audio bytes, {got} remain")]
    TruncatedAudio { expected: usize, got: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
