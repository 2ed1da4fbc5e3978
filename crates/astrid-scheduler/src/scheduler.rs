//! The three-list scheduler and per-tick mixer.

use std::sync::Arc;

use astrid_core::{Buffer, TickClock};
use crossbeam::queue::ArrayQueue;

use crate::event::Event;
use crate::handoff::{ScheduleHandle, Scheduled};

const DEFAULT_INBOX_CAPACITY: usize = 256;

/// Owns every event and the current output frame.
///
/// Single-owner discipline: `schedule_event` and `tick` must be called
/// from one thread. In a realtime host that thread is the audio callback;
/// renderers go through [`ScheduleHandle`] instead.
pub struct Scheduler {
    waiting: Vec<Event>,
    playing: Vec<Event>,
    nursery: Vec<Event>,
    current_frame: Vec<f32>,
    channels: usize,
    clock: TickClock,
    event_count: u64,
    inbox: Arc<ArrayQueue<Scheduled>>,
}

impl Scheduler {
    pub fn new(channels: usize, samplerate: usize, realtime: bool) -> Self {
        Self::with_inbox_capacity(channels, samplerate, realtime, DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_inbox_capacity(
        channels: usize,
        samplerate: usize,
        realtime: bool,
        inbox_capacity: usize,
    ) -> Self {
        Self {
            waiting: Vec::new(),
            playing: Vec::new(),
            nursery: Vec::new(),
            current_frame: vec![0.0; channels],
            channels,
            clock: TickClock::new(samplerate, realtime),
            event_count: 0,
            inbox: Arc::new(ArrayQueue::new(inbox_capacity)),
        }
    }

    /// A cloneable producer handle for other threads.
    pub fn schedule_handle(&self) -> ScheduleHandle {
        ScheduleHandle {
            inbox: Arc::clone(&self.inbox),
        }
    }

    /// Schedule a buffer to start `delay` ticks from now.
    ///
    /// Events are recycled from the nursery when possible; a recycled
    /// event is fully reset and its previous buffer dropped before the
    /// new one is installed.
    pub fn schedule_event(&mut self, buf: Buffer, delay: u64) {
        let onset = self.clock.ticks + delay;
        let event = match self.nursery.pop() {
            Some(mut event) => {
                event.buf = buf;
                event.pos = 0;
                event.onset = onset;
                event
            }
            None => {
                self.event_count += 1;
                Event {
                    id: self.event_count,
                    buf,
                    pos: 0,
                    onset,
                }
            }
        };
        self.waiting.push(event);
    }

    /// Process one output frame.
    ///
    /// Promotes due events, mixes everything playing into the current
    /// frame, advances positions, retires finished events into the
    /// nursery, then advances the tick clock.
    pub fn tick(&mut self) {
        // Drain renders queued by other threads since the last frame.
        while let Some(scheduled) = self.inbox.pop() {
            self.schedule_event(scheduled.buf, scheduled.delay);
        }

        // Promote. Order is preserved so same-onset events mix in
        // append order.
        let ticks = self.clock.ticks;
        let mut i = 0;
        while i < self.waiting.len() {
            if self.waiting[i].onset <= ticks {
                let event = self.waiting.remove(i);
                self.playing.push(event);
            } else {
                i += 1;
            }
        }

        // Mix. The sum runs in list order, so the result is deterministic
        // for a given schedule. No clipping or normalisation here.
        for (c, out) in self.current_frame.iter_mut().enumerate() {
            let mut sample = 0.0f32;
            for event in &self.playing {
                if event.pos < event.frames() {
                    sample += event.buf.sample(event.pos as usize, c);
                }
            }
            *out = sample;
        }

        // Advance.
        for event in &mut self.playing {
            event.pos += 1;
        }

        // Retire events that have played their last frame.
        let mut i = 0;
        while i < self.playing.len() {
            if self.playing[i].finished() {
                let event = self.playing.remove(i);
                self.nursery.push(event);
            } else {
                i += 1;
            }
        }

        self.clock.advance();
    }

    /// The frame mixed by the last `tick()`.
    pub fn current_frame(&self) -> &[f32] {
        &self.current_frame
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Anything still waiting or sounding?
    pub fn is_playing(&self) -> bool {
        !self.waiting.is_empty() || !self.playing.is_empty()
    }

    pub fn count_waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn count_playing(&self) -> usize {
        self.playing.len()
    }

    pub fn count_done(&self) -> usize {
        self.nursery.len()
    }

    /// Drop the buffers held by nursery events, keeping the events for
    /// reuse.
    pub fn cleanup_nursery(&mut self) {
        for event in &mut self.nursery {
            event.buf = Buffer::empty(event.buf.channels, event.buf.samplerate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: &[f32]) -> Buffer {
        Buffer::from_frames(samples.to_vec(), 1, 48000)
    }

    #[test]
    fn test_single_event_plays_every_sample() {
        // A four-frame mono buffer at delay 2 into a stereo scheduler.
        let mut s = Scheduler::new(2, 48000, false);
        s.schedule_event(mono(&[1.0, 2.0, 3.0, 4.0]), 2);

        let mut frames = Vec::new();
        for _ in 0..7 {
            s.tick();
            frames.push([s.current_frame()[0], s.current_frame()[1]]);
        }

        assert_eq!(
            frames,
            vec![
                [0.0, 0.0],
                [0.0, 0.0],
                [1.0, 1.0],
                [2.0, 2.0],
                [3.0, 3.0],
                [4.0, 4.0],
                [0.0, 0.0],
            ]
        );
        assert_eq!(s.count_done(), 1);
        assert!(!s.is_playing());
    }

    #[test]
    fn test_overlapping_events_sum() {
        let mut s = Scheduler::new(2, 48000, false);
        s.schedule_event(mono(&[1.0, 1.0, 1.0]), 0);
        s.schedule_event(mono(&[2.0, 2.0, 2.0]), 1);

        let mut frames = Vec::new();
        for _ in 0..5 {
            s.tick();
            frames.push(s.current_frame()[0]);
        }
        assert_eq!(frames, vec![1.0, 3.0, 3.0, 2.0, 0.0]);
    }

    #[test]
    fn test_event_in_exactly_one_list() {
        let mut s = Scheduler::new(2, 48000, false);
        s.schedule_event(mono(&[1.0, 1.0]), 1);

        let totals = |s: &Scheduler| s.count_waiting() + s.count_playing() + s.count_done();
        assert_eq!((s.count_waiting(), totals(&s)), (1, 1));

        s.tick();
        assert_eq!((s.count_waiting(), totals(&s)), (1, 1));
        s.tick();
        assert_eq!((s.count_playing(), totals(&s)), (1, 1));
        s.tick();
        assert_eq!((s.count_done(), totals(&s)), (1, 1));
    }

    #[test]
    fn test_nursery_recycling_resets_state() {
        let mut s = Scheduler::new(1, 48000, false);
        s.schedule_event(mono(&[1.0]), 0);
        s.tick();
        assert_eq!(s.count_done(), 1);

        // Recycled event keeps its id but nothing else.
        s.schedule_event(mono(&[5.0, 6.0]), 0);
        assert_eq!(s.count_waiting(), 1);
        assert_eq!(s.count_done(), 0);

        s.tick();
        assert_eq!(s.current_frame()[0], 5.0);
        s.tick();
        assert_eq!(s.current_frame()[0], 6.0);
    }

    #[test]
    fn test_mixing_linearity_single_event() {
        // One playing event: the frame equals the buffer sample with
        // modular channel mapping.
        let mut s = Scheduler::new(3, 48000, false);
        let buf = Buffer::from_frames(vec![0.25, -0.5, 0.75, -1.0], 2, 48000);
        s.schedule_event(buf, 0);

        s.tick();
        assert_eq!(s.current_frame(), &[0.25, -0.5, 0.25]);
        s.tick();
        assert_eq!(s.current_frame(), &[0.75, -1.0, 0.75]);
    }

    #[test]
    fn test_same_onset_mixes_in_append_order() {
        let mut s = Scheduler::new(1, 48000, false);
        s.schedule_event(mono(&[1.0]), 0);
        s.schedule_event(mono(&[2.0]), 0);
        s.tick();
        // Deterministic stable sum; both contribute once.
        assert_eq!(s.current_frame()[0], 3.0);
        assert_eq!(s.count_done(), 2);
    }

    #[test]
    fn test_handoff_feeds_tick() {
        let mut s = Scheduler::new(1, 48000, false);
        let handle = s.schedule_handle();
        handle.schedule(mono(&[9.0]), 0).unwrap();

        s.tick();
        assert_eq!(s.current_frame()[0], 9.0);
    }

    #[test]
    fn test_full_inbox_returns_buffer() {
        let mut s = Scheduler::with_inbox_capacity(1, 48000, false, 1);
        let handle = s.schedule_handle();
        handle.schedule(mono(&[1.0]), 0).unwrap();

        let err = handle.schedule(mono(&[2.0]), 0).unwrap_err();
        let crate::SchedulerError::InboxFull(rejected) = err;
        assert_eq!(rejected.data, vec![2.0]);

        s.tick();
        assert_eq!(s.current_frame()[0], 1.0);
    }

    #[test]
    fn test_cleanup_nursery_drops_buffers() {
        let mut s = Scheduler::new(1, 48000, false);
        s.schedule_event(mono(&[1.0, 2.0]), 0);
        s.tick();
        s.tick();
        assert_eq!(s.count_done(), 1);

        s.cleanup_nursery();
        assert_eq!(s.count_done(), 1);

        // Recycling still works after cleanup.
        s.schedule_event(mono(&[7.0]), 0);
        s.tick();
        assert_eq!(s.current_frame()[0], 7.0);
    }

    #[test]
    fn test_offline_clock_tracks_ticks_exactly() {
        let mut s = Scheduler::new(2, 48000, false);
        for _ in 0..480 {
            s.tick();
        }
        assert_eq!(s.ticks(), 480);
        assert_eq!(s.clock().elapsed_ns(), 480 * s.clock().tick_ns);
    }
}
