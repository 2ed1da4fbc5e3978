//! Monotonic time, shared across processes, and the per-frame tick clock.

use std::io;
use std::mem::MaybeUninit;

/// Nanoseconds per second.
pub const NS_PER_SEC: u64 = 1_000_000_000;

fn monotonic_ns() -> io::Result<u64> {
    let mut ts = MaybeUninit::<libc::timespec>::uninit();
    // CLOCK_MONOTONIC has the same epoch in every process on the machine,
    // which is what makes message timestamps comparable across the
    // sequencer, renderers, and injectors.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, ts.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let ts = unsafe { ts.assume_init() };
    Ok(ts.tv_sec as u64 * NS_PER_SEC + ts.tv_nsec as u64)
}

/// Seconds on the machine-wide monotonic clock.
///
/// Message timestamps and dispatcher deadlines live on this clock.
pub fn now_seconds() -> f64 {
    match monotonic_ns() {
        Ok(ns) => ns as f64 * 1e-9,
        Err(err) => {
            tracing::error!("clock_gettime failed: {err}");
            0.0
        }
    }
}

/// Frame-granular clock driving the audio event scheduler.
///
/// One tick is one output frame. In realtime mode `now_ns` tracks the
/// monotonic clock; in offline mode it advances by exactly `tick_ns`
/// per tick, so offline renders are deterministic.
#[derive(Debug, Clone)]
pub struct TickClock {
    pub ticks: u64,
    pub tick_ns: u64,
    pub realtime: bool,
    init_ns: u64,
    now_ns: u64,
}

impl TickClock {
    pub fn new(samplerate: usize, realtime: bool) -> Self {
        // Nanoseconds per frame.
        let tick_ns = NS_PER_SEC / samplerate as u64;
        let init_ns = if realtime {
            monotonic_ns().unwrap_or(0)
        } else {
            0
        };
        Self {
            ticks: 0,
            tick_ns,
            realtime,
            init_ns,
            now_ns: init_ns,
        }
    }

    /// Advance one frame.
    pub fn advance(&mut self) {
        self.ticks += 1;
        if self.realtime {
            self.now_ns = monotonic_ns().unwrap_or(self.now_ns + self.tick_ns);
        } else {
            self.now_ns += self.tick_ns;
        }
    }

    /// Nanoseconds since the clock was created.
    pub fn elapsed_ns(&self) -> u64 {
        self.now_ns - self.init_ns
    }

    /// Convert an elapsed duration in nanoseconds to whole ticks.
    pub fn ns_to_ticks(&self, ns: u64) -> u64 {
        ns / self.tick_ns
    }
}
