//! The Astrid sequencer: deadline-ordered control message dispatch.
//!
//! Producers drop timestamped messages into the broker queue; the feeder
//! thread moves them into a stable priority queue; the dispatcher thread
//! relays each one to its instrument's play queue when its deadline
//! arrives. Stop messages cancel everything queued for a voice before it
//! ever reaches a renderer.

mod error;
pub use error::{Result, SeqError};

mod pq;
pub use pq::MsgPq;

mod dispatcher;
pub use dispatcher::{run_dispatcher, run_feeder, POLL_INTERVAL};

mod sequencer;
pub use sequencer::Sequencer;
