//! Feeder and dispatcher loops.
//!
//! The feeder blocks on the broker queue and moves every message into
//! the priority queue. The dispatcher polls the queue head and relays
//! each message to its instrument's play queue once its deadline
//! arrives. A `Shutdown` message flows through both, which is how the
//! whole process winds down in-band.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use astrid_core::{clock, MessageKind};
use astrid_ipc::{queue, IpcError, MessageQueue, Paths};

use crate::error::Result;
use crate::pq::MsgPq;

/// Sleep quantum for the dispatcher's poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Drain the broker queue into the priority queue until shutdown.
pub fn run_feeder(pq: &MsgPq, queue: &mut MessageQueue, running: &AtomicBool) -> Result<()> {
    tracing::info!("message feed waiting on broker queue");

    while running.load(Ordering::Acquire) {
        let msg = match queue.recv() {
            Ok(msg) => msg,
            Err(IpcError::Interrupted) => continue,
            Err(IpcError::BadMessage(err)) => {
                tracing::warn!("dropping undecodable broker message: {err}");
                continue;
            }
            Err(IpcError::TransportClosed) => {
                tracing::info!("broker queue closed, feeder exiting");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let kind = msg.kind;
        tracing::debug!("feeding {kind:?} message into pq");
        pq.insert(msg);

        // The shutdown node still goes through the pq so the dispatcher
        // sees it in deadline order.
        if kind == MessageKind::Shutdown {
            break;
        }
    }

    tracing::info!("message feed shutting down");
    Ok(())
}

/// Relay due messages from the priority queue to play queues until a
/// `Shutdown` reaches the head.
pub fn run_dispatcher(pq: &MsgPq, paths: &Paths, running: &AtomicBool) -> Result<()> {
    tracing::info!("message dispatcher starting");

    while running.load(Ordering::Acquire) {
        let head = match pq.peek() {
            Some(head) => head,
            None => {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
        };

        match head.kind {
            MessageKind::Shutdown => break,
            MessageKind::StopVoice => {
                // Cancel everything queued for the voice, the stop node
                // included.
                let removed = pq.remove_voice(head.voice_id);
                tracing::info!("stop: removed {removed} queued messages for voice {}", head.voice_id);
                continue;
            }
            MessageKind::StopInstrument => {
                tracing::info!("ignoring stop-instrument for {}", head.instrument_name);
                pq.pop();
                continue;
            }
            MessageKind::Empty => {
                pq.pop();
                continue;
            }
            MessageKind::Play | MessageKind::Trigger | MessageKind::Load => {}
        }

        if head.timestamp > clock::now_seconds() {
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }

        match queue::send_play(paths, &head) {
            Ok(()) => {
                pq.pop();
            }
            Err(IpcError::TransportFull) => {
                // Keep the head; retry once the play queue drains or its
                // renderer appears.
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                tracing::error!(
                    "dropping {:?} for {}: {err}",
                    head.kind,
                    head.instrument_name
                );
                pq.pop();
            }
        }
    }

    tracing::info!("message dispatcher shutting down");
    Ok(())
}
