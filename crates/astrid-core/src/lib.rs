//! Core types for the Astrid instrument host.
//!
//! Everything here is process-local and allocation-friendly: the control
//! [`Message`] record and its fixed-layout wire codec, owned audio
//! [`Buffer`]s, the buffer+message wire format used between renderers,
//! and the monotonic clocks the schedulers run on.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::AstridConfig;

mod message;
pub use message::{validate_instrument_name, Message, MessageKind, MAX_MSG, MAX_NAME};

mod buffer;
pub use buffer::Buffer;

mod wire;
pub use wire::{deserialize_buffer, serialize_buffer};

pub mod clock;
pub use clock::{now_seconds, TickClock, NS_PER_SEC};
