//! Shared-memory IPC primitives for the Astrid host.
//!
//! Everything multiple processes touch lives here: named value cells and
//! counters guarded by POSIX semaphores, the shared ADC ring buffer, the
//! filesystem id registry that lets any process attach by path, and the
//! control-plane message queues.
//!
//! Creation is idempotent throughout: a crashed process leaves orphan
//! segments behind, and the next `create` reclaims them instead of
//! failing.

pub mod error;
pub use error::{IpcError, Result};

pub mod paths;
pub use paths::{posix_name, segment_path, Paths};

pub mod registry;

mod sem;
pub use sem::{SemGuard, Semaphore};

mod cell;
pub use cell::{create_cell, destroy_cell, get_cell, set_cell, ValueCell};

mod counter;
pub use counter::Counter;

pub mod device;

mod ring;
pub use ring::AdcRing;

pub mod queue;
pub use queue::{send, send_play, MessageQueue};
