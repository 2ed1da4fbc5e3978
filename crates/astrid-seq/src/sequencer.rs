//! The sequencer process: feeder + dispatcher + shared voice counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use astrid_core::{Message, MessageKind};
use astrid_ipc::{queue, Counter, MessageQueue, Paths};

use crate::dispatcher::{run_dispatcher, run_feeder};
use crate::error::{Result, SeqError};
use crate::pq::MsgPq;

/// Owns the sequencer's worker threads and shared state.
///
/// Startup creates the voice counter (reclaiming any orphan left by a
/// crash), opens the broker queue, and spawns the feeder and dispatcher.
/// Shutdown is in-band: send a `Shutdown` message and both workers wind
/// down; `join` then reaps them and destroys the counter.
pub struct Sequencer {
    paths: Paths,
    running: Arc<AtomicBool>,
    feeder: Option<thread::JoinHandle<Result<()>>>,
    dispatcher: Option<thread::JoinHandle<Result<()>>>,
}

impl Sequencer {
    pub fn start(paths: Paths) -> Result<Self> {
        Counter::create(&paths.voice_counter())?;

        let pq = Arc::new(MsgPq::new());
        let running = Arc::new(AtomicBool::new(true));

        // Open before spawning so sends are accepted as soon as start
        // returns.
        let mut broker = MessageQueue::open_broker(&paths)?;

        let feeder = {
            let pq = Arc::clone(&pq);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("astrid-feeder".to_string())
                .spawn(move || run_feeder(&pq, &mut broker, &running))?
        };

        let dispatcher = {
            let pq = Arc::clone(&pq);
            let running = Arc::clone(&running);
            let paths = paths.clone();
            thread::Builder::new()
                .name("astrid-dispatcher".to_string())
                .spawn(move || run_dispatcher(&pq, &paths, &running))?
        };

        tracing::info!("sequencer started at root {}", paths.root().display());

        Ok(Self {
            paths,
            running,
            feeder: Some(feeder),
            dispatcher: Some(dispatcher),
        })
    }

    /// Flag observable from signal handlers.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// True once both workers have wound down, e.g. after an in-band
    /// `Shutdown` arrived from another process.
    pub fn workers_finished(&self) -> bool {
        self.feeder.as_ref().map_or(true, |h| h.is_finished())
            && self.dispatcher.as_ref().map_or(true, |h| h.is_finished())
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Send the in-band shutdown message through the broker queue. This
    /// is what unblocks the feeder.
    pub fn shutdown(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        let msg = Message::new(MessageKind::Shutdown, "sequencer")?;
        match queue::send(&self.paths, &msg) {
            Ok(()) => Ok(()),
            // A finished feeder has dropped the broker fd; there is
            // nobody left to unblock.
            Err(astrid_ipc::IpcError::TransportFull)
                if self.feeder.as_ref().map_or(true, |h| h.is_finished()) =>
            {
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Wait for both workers, then tear down the voice counter.
    pub fn join(mut self) -> Result<()> {
        for handle in [self.feeder.take(), self.dispatcher.take()].into_iter().flatten() {
            handle.join().map_err(|_| SeqError::WorkerPanic)??;
        }

        Counter::destroy(&self.paths.voice_counter())?;
        tracing::info!("sequencer stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_start_shutdown_join() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        let seq = Sequencer::start(paths.clone()).unwrap();
        assert!(paths.voice_counter().exists());

        seq.shutdown().unwrap();
        seq.join().unwrap();

        // Counter torn down on orderly exit.
        assert!(!paths.voice_counter().exists());
    }

    #[test]
    fn test_relays_due_messages() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        let seq = Sequencer::start(paths.clone()).unwrap();
        let mut playq = MessageQueue::open_play(&paths, "pulsar").unwrap();

        let mut msg = Message::new(MessageKind::Play, "pulsar").unwrap();
        msg.voice_id = 1;
        queue::send(&paths, &msg).unwrap();

        let got = playq
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .expect("play message relayed");
        assert_eq!(got.voice_id, 1);

        seq.shutdown().unwrap();
        seq.join().unwrap();
    }
}
