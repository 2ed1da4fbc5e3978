//! Kernel POSIX message queue transport.
//!
//! `mq_*` queues keep strict record boundaries, so no framing is needed:
//! each receive hands back exactly one `Message::WIRE_SIZE` record. The
//! priority field is unused. Queue names are derived from the same path
//! builder as the pipe flavor, folded into a single-slash POSIX name.

use std::ffi::CString;
use std::io;
use std::path::Path;
use std::time::Duration;

use astrid_core::Message;

use crate::error::{IpcError, Result};
use crate::paths::{posix_name, Paths};

use super::MQ_MAXMSG;

const MQ_PERMS: libc::mode_t = 0o644;

fn mq_name(path: &Path) -> Result<CString> {
    CString::new(posix_name(path)).map_err(|_| {
        IpcError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "interior NUL in queue name",
        ))
    })
}

fn open_mq(path: &Path, flags: libc::c_int) -> Result<libc::mqd_t> {
    let name = mq_name(path)?;

    let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
    attr.mq_maxmsg = MQ_MAXMSG as _;
    attr.mq_msgsize = Message::WIRE_SIZE as _;

    let mqd = unsafe {
        libc::mq_open(
            name.as_ptr(),
            flags | libc::O_CREAT,
            MQ_PERMS as libc::c_uint,
            &mut attr as *mut libc::mq_attr,
        )
    };
    if mqd == -1 as libc::mqd_t {
        return Err(IpcError::Io(io::Error::last_os_error()));
    }
    Ok(mqd)
}

/// Reader end of a message queue.
pub struct MessageQueue {
    mqd: libc::mqd_t,
}

// mqd_t is a kernel handle; operations on it are serialised by the kernel.
unsafe impl Send for MessageQueue {}

impl MessageQueue {
    /// Open the broker queue for reading, creating it if needed.
    pub fn open_broker(paths: &Paths) -> Result<Self> {
        Ok(Self {
            mqd: open_mq(&paths.broker_queue(), libc::O_RDONLY)?,
        })
    }

    /// Open an instrument's play queue for reading, creating it if needed.
    pub fn open_play(paths: &Paths, instrument_name: &str) -> Result<Self> {
        Ok(Self {
            mqd: open_mq(&paths.play_queue(instrument_name)?, libc::O_RDONLY)?,
        })
    }

    /// Block until one complete message arrives.
    pub fn recv(&mut self) -> Result<Message> {
        let mut rec = [0u8; Message::WIRE_SIZE];
        loop {
            let n = unsafe {
                libc::mq_receive(
                    self.mqd,
                    rec.as_mut_ptr().cast(),
                    rec.len(),
                    std::ptr::null_mut(),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err.into());
            }
            if n as usize != Message::WIRE_SIZE {
                return Err(IpcError::BadMessage(astrid_core::Error::ShortRecord {
                    expected: Message::WIRE_SIZE,
                    got: n as usize,
                }));
            }
            return Ok(Message::decode(&rec)?);
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`, returning
    /// `None` when nothing arrived in time.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>> {
        let mut ts = std::mem::MaybeUninit::<libc::timespec>::uninit();
        if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, ts.as_mut_ptr()) } != 0 {
            return Err(IpcError::Io(io::Error::last_os_error()));
        }
        let mut ts = unsafe { ts.assume_init() };
        ts.tv_sec += timeout.as_secs() as libc::time_t;
        ts.tv_nsec += timeout.subsec_nanos() as libc::c_long;
        if ts.tv_nsec >= 1_000_000_000 {
            ts.tv_sec += 1;
            ts.tv_nsec -= 1_000_000_000;
        }

        let mut rec = [0u8; Message::WIRE_SIZE];
        loop {
            let n = unsafe {
                libc::mq_timedreceive(
                    self.mqd,
                    rec.as_mut_ptr().cast(),
                    rec.len(),
                    std::ptr::null_mut(),
                    &ts,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR) => continue,
                    Some(libc::ETIMEDOUT) => return Ok(None),
                    _ => return Err(err.into()),
                }
            }
            if n as usize != Message::WIRE_SIZE {
                return Err(IpcError::BadMessage(astrid_core::Error::ShortRecord {
                    expected: Message::WIRE_SIZE,
                    got: n as usize,
                }));
            }
            return Ok(Some(Message::decode(&rec)?));
        }
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        unsafe {
            libc::mq_close(self.mqd);
        }
    }
}

fn send_to(path: &Path, msg: &Message) -> Result<()> {
    let mqd = open_mq(path, libc::O_WRONLY)?;
    let rec = msg.encode()?;

    let result = loop {
        let rc = unsafe { libc::mq_send(mqd, rec.as_ptr().cast(), rec.len(), 0) };
        if rc == 0 {
            break Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::EAGAIN) => break Err(IpcError::TransportFull),
            _ => break Err(err.into()),
        }
    };

    unsafe {
        libc::mq_close(mqd);
    }
    result
}

/// Enqueue a message on the broker queue.
pub fn send(paths: &Paths, msg: &Message) -> Result<()> {
    send_to(&paths.broker_queue(), msg)
}

/// Enqueue a message on its instrument's play queue, creating the queue
/// on first send.
pub fn send_play(paths: &Paths, msg: &Message) -> Result<()> {
    send_to(&paths.play_queue(&msg.instrument_name)?, msg)
}

/// Remove the named queues for a deployment. Missing queues are fine.
pub fn unlink(paths: &Paths) -> Result<()> {
    let name = mq_name(&paths.broker_queue())?;
    let rc = unsafe { libc::mq_unlink(name.as_ptr()) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ENOENT) {
            return Err(err.into());
        }
    }
    Ok(())
}
