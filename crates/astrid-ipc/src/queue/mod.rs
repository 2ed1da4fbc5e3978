//! Inter-process control message queues.
//!
//! One broker queue carries every control message; each instrument gets
//! its own play queue, created lazily on first send. Two transports are
//! selectable at build time: named pipes (default) and kernel POSIX
//! message queues (`posix-mq` feature). Both carry the fixed-size
//! [`Message`](astrid_core::Message) record and guarantee a complete
//! record is never split across reads.

#[cfg(not(feature = "posix-mq"))]
mod fifo;
#[cfg(not(feature = "posix-mq"))]
pub use fifo::{send, send_play, MessageQueue};

#[cfg(feature = "posix-mq")]
mod mq;
#[cfg(feature = "posix-mq")]
pub use mq::{send, send_play, MessageQueue};

/// Depth of a kernel message queue, within the usual unprivileged limit.
#[cfg(feature = "posix-mq")]
pub const MQ_MAXMSG: i64 = 10;
