//! Instrument render loop.
//!
//! A renderer process owns one instrument: it blocks on the instrument's
//! play queue, asks the instrument to render each play message into
//! audio, and hands the resulting buffers to the audio event scheduler
//! through its lock-free inbox. The DSP itself lives behind the
//! [`Instrument`] trait; this crate only does the plumbing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use astrid_core::{Buffer, Message, MessageKind};
use astrid_ipc::{IpcError, MessageQueue, Paths};
use astrid_scheduler::{ScheduleHandle, SchedulerError};
use thiserror::Error;

/// How long to back off when the schedule inbox is full.
const INBOX_BACKOFF: Duration = Duration::from_millis(1);

/// Error type for the render loop.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Transport: {0}")]
    Ipc(#[from] IpcError),

    #[error("Instrument failed: {0}")]
    Instrument(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[cfg(feature = "session")]
    #[error("Session db: {0}")]
    Session(#[from] astrid_session::SessionError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RendererError>;

/// The seam between the host and user instrument code.
///
/// Implementations render a play message into zero or more buffers. The
/// embedded interpreter, DSP library, and hot-reload machinery all live
/// on the far side of this trait.
pub trait Instrument {
    /// The instrument's registered name, used to locate its play queue.
    fn name(&self) -> &str;

    /// Render one play message into audio.
    fn render(
        &mut self,
        msg: &Message,
    ) -> std::result::Result<Vec<Buffer>, Box<dyn std::error::Error + Send + Sync>>;

    /// Reload instrument state on a `Load` message.
    fn reload(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Drives one [`Instrument`] from its play queue into the scheduler.
pub struct Renderer<I: Instrument> {
    paths: Paths,
    instrument: I,
    handle: ScheduleHandle,
    running: Arc<AtomicBool>,
    render_counts: std::collections::HashMap<u64, u64>,
    #[cfg(feature = "session")]
    session: Option<astrid_session::SessionDb>,
}

impl<I: Instrument> Renderer<I> {
    pub fn new(paths: Paths, instrument: I, handle: ScheduleHandle) -> Self {
        Self {
            paths,
            instrument,
            handle,
            running: Arc::new(AtomicBool::new(true)),
            render_counts: std::collections::HashMap::new(),
            #[cfg(feature = "session")]
            session: None,
        }
    }

    /// Attach a session database for voice lifecycle tracking.
    #[cfg(feature = "session")]
    pub fn with_session(mut self, session: astrid_session::SessionDb) -> Self {
        self.session = Some(session);
        self
    }

    /// Flag observable from signal handlers; clearing it stops the loop
    /// at the next message boundary.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Block on the play queue until shutdown.
    pub fn run(&mut self) -> Result<()> {
        let mut queue = MessageQueue::open_play(&self.paths, self.instrument.name())?;
        tracing::info!("renderer for {} waiting for messages", self.instrument.name());

        while self.running.load(Ordering::Acquire) {
            let msg = match queue.recv() {
                Ok(msg) => msg,
                Err(IpcError::Interrupted) => continue,
                Err(IpcError::BadMessage(err)) => {
                    tracing::warn!("dropping undecodable play message: {err}");
                    continue;
                }
                Err(IpcError::TransportClosed) => break,
                Err(err) => return Err(err.into()),
            };

            match msg.kind {
                MessageKind::Shutdown => break,
                MessageKind::Load => {
                    if let Err(err) = self.instrument.reload() {
                        tracing::error!("reload failed: {err}");
                    }
                }
                MessageKind::Play | MessageKind::Trigger => {
                    if let Err(err) = self.render_one(&msg) {
                        tracing::error!("render failed for voice {}: {err}", msg.voice_id);
                    }
                }
                MessageKind::StopVoice | MessageKind::StopInstrument => {
                    #[cfg(feature = "session")]
                    if let Some(session) = &self.session {
                        let count = self.render_counts.remove(&msg.voice_id).unwrap_or(0);
                        session.mark_voice_stopped(msg.voice_id, count)?;
                    }
                    #[cfg(not(feature = "session"))]
                    tracing::debug!("ignoring stop for voice {}", msg.voice_id);
                }
                MessageKind::Empty => {}
            }
        }

        tracing::info!("renderer for {} shutting down", self.instrument.name());
        Ok(())
    }

    fn render_one(&mut self, msg: &Message) -> Result<()> {
        #[cfg(feature = "session")]
        if let Some(session) = &self.session {
            if !self.render_counts.contains_key(&msg.voice_id) {
                session.insert_voice(msg)?;
            }
        }

        let buffers = self.instrument.render(msg)?;
        let rendered = !buffers.is_empty();
        for buf in buffers {
            self.push(buf)?;
        }

        if rendered {
            let count = self.render_counts.entry(msg.voice_id).or_insert(0);
            let first = *count == 0;
            *count += 1;

            #[cfg(feature = "session")]
            if let Some(session) = &self.session {
                if first {
                    session.mark_voice_active(msg.voice_id)?;
                } else {
                    session.increment_render_count(msg.voice_id, *count)?;
                }
            }
            #[cfg(not(feature = "session"))]
            let _ = first;
        }

        Ok(())
    }

    /// Push one buffer into the scheduler, backing off while the inbox
    /// is full.
    fn push(&self, mut buf: Buffer) -> Result<()> {
        loop {
            match self.handle.schedule(buf, 0) {
                Ok(()) => return Ok(()),
                Err(SchedulerError::InboxFull(rejected)) => {
                    if !self.running.load(Ordering::Acquire) {
                        tracing::warn!("dropping buffer on shutdown: inbox full");
                        return Ok(());
                    }
                    buf = rejected;
                    std::thread::sleep(INBOX_BACKOFF);
                }
            }
        }
    }
}
