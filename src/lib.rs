//! # Astrid - Distributed Real-time Audio Instrument Host
//!
//! Umbrella crate over the host's subsystems:
//! - **astrid-core** - Control messages, buffers, wire codecs, clocks
//! - **astrid-ipc** - Shared cells, counters, the ADC ring, message queues
//! - **astrid-midi** - MIDI latest-value state and note trigger maps
//! - **astrid-scheduler** - The waiting/playing/nursery event scheduler
//! - **astrid-renderer** - Play-queue drain and instrument hand-off
//! - **astrid-seq** - Deadline dispatcher and the sequencer process
//! - **astrid-session** - Optional voice session database
//!
//! ## Quick start
//!
//! ```no_run
//! use astrid::{Paths, Sequencer};
//!
//! // One sequencer per machine routes control messages.
//! let sequencer = Sequencer::start(Paths::default())?;
//!
//! // ... renderers and injectors do their work ...
//!
//! sequencer.shutdown()?;
//! sequencer.join()?;
//! # Ok::<(), astrid::SeqError>(())
//! ```
//!
//! ## Feature flags
//!
//! - `session` - Voice session database (SQLite)
//! - `posix-mq` - Kernel POSIX message queues instead of named pipes

/// Re-export of astrid-core for direct access
pub use astrid_core as core;

pub use astrid_core::{
    clock, deserialize_buffer, now_seconds, serialize_buffer, AstridConfig, Buffer, Message,
    MessageKind, TickClock, MAX_MSG, MAX_NAME,
};

pub use astrid_ipc::{
    queue, registry, AdcRing, Counter, IpcError, MessageQueue, Paths, Semaphore, ValueCell,
};

pub use astrid_midi::{get_cc, get_note, set_cc, set_note, Notemap};

pub use astrid_scheduler::{Event, ScheduleHandle, Scheduler, SchedulerError};

pub use astrid_renderer::{Instrument, Renderer, RendererError};

pub use astrid_seq::{MsgPq, SeqError, Sequencer};

#[cfg(feature = "session")]
pub use astrid_session::{SessionDb, SessionError, VoiceRow};
