//! Lock-free hand-off from render threads to the audio callback.

use std::sync::Arc;

use astrid_core::Buffer;
use crossbeam::queue::ArrayQueue;

use crate::error::{Result, SchedulerError};

pub(crate) struct Scheduled {
    pub buf: Buffer,
    pub delay: u64,
}

/// Producer side of the schedule inbox. Clone is cheap.
///
/// The scheduler's three lists are owned exclusively by whoever calls
/// `tick()`; this handle is how every other thread schedules playback
/// without touching them.
#[derive(Clone)]
pub struct ScheduleHandle {
    pub(crate) inbox: Arc<ArrayQueue<Scheduled>>,
}

impl ScheduleHandle {
    /// Queue a buffer to start playing `delay` ticks after the next
    /// `tick()` observes it. Returns the buffer on a full inbox so the
    /// caller can back off and retry.
    pub fn schedule(&self, buf: Buffer, delay: u64) -> Result<()> {
        self.inbox
            .push(Scheduled { buf, delay })
            .map_err(|rejected| SchedulerError::InboxFull(rejected.buf))
    }
}
