//! Scheduler events.

use astrid_core::Buffer;

/// One scheduled playback of a rendered buffer.
///
/// An event lives in exactly one of the scheduler's three lists at any
/// time. `pos` is the playback cursor in frames; `onset` is the tick at
/// which the event leaves the waiting list. Ids are assigned once, when
/// the event is first allocated, and survive recycling.
#[derive(Debug)]
pub struct Event {
    pub id: u64,
    pub buf: Buffer,
    pub pos: u64,
    pub onset: u64,
}

impl Event {
    /// Frames in the owned buffer.
    pub fn frames(&self) -> u64 {
        self.buf.frames() as u64
    }

    /// Finished events have played every frame.
    pub fn finished(&self) -> bool {
        self.pos >= self.frames()
    }
}
