//! MIDI state and trigger maps.
//!
//! Latest CC and note values are plain id-registry cells at deterministic
//! paths, so any process can poll them without holding MIDI device state.
//! Notemaps bind control messages to incoming notes: an append-only file
//! of wire records per `(device, note)`, replayed into the broker queue
//! whenever the note fires.

mod state;
pub use state::{get_cc, get_note, set_cc, set_note};

mod notemap;
pub use notemap::Notemap;

pub use astrid_ipc::{IpcError, Result};
