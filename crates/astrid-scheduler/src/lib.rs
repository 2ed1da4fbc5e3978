//! Sample-accurate audio event scheduler.
//!
//! Rendered buffers become [`Event`]s that move through three lists:
//! *waiting* until their onset tick, *playing* while they mix into the
//! output frame, and the *nursery* once finished, where they wait to be
//! recycled. [`Scheduler::tick`] runs once per output frame from the
//! audio callback; renderers feed it through a lock-free
//! [`ScheduleHandle`] so the callback never takes a lock.

mod error;
pub use error::{Result, SchedulerError};

mod event;
pub use event::Event;

mod handoff;
pub use handoff::ScheduleHandle;

mod scheduler;
pub use scheduler::Scheduler;
