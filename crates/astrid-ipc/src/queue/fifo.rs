//! Named-pipe message transport.
//!
//! Each message is exactly `Message::WIRE_SIZE` bytes. Records are well
//! under `PIPE_BUF`, so concurrent senders never interleave a record;
//! short reads are accumulated until a full record arrives. Readers open
//! the pipe read-write so an idle queue blocks instead of hitting EOF
//! when the last writer closes.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use astrid_core::Message;

use crate::error::{IpcError, Result};
use crate::paths::Paths;

const FIFO_PERMS: libc::mode_t = 0o622;

fn ensure_fifo(path: &Path) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
        IpcError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "interior NUL in queue path",
        ))
    })?;

    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_PERMS) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EEXIST) {
            return Err(err.into());
        }
    }
    Ok(())
}

/// Reader end of a message queue.
pub struct MessageQueue {
    file: File,
    path: PathBuf,
}

impl MessageQueue {
    /// Open the broker queue for reading, creating the pipe if needed.
    pub fn open_broker(paths: &Paths) -> Result<Self> {
        Self::open(paths.broker_queue())
    }

    /// Open an instrument's play queue for reading, creating the pipe if
    /// needed.
    pub fn open_play(paths: &Paths, instrument_name: &str) -> Result<Self> {
        Self::open(paths.play_queue(instrument_name)?)
    }

    fn open(path: PathBuf) -> Result<Self> {
        ensure_fifo(&path)?;
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until one complete message arrives.
    pub fn recv(&mut self) -> Result<Message> {
        let mut rec = [0u8; Message::WIRE_SIZE];
        let mut filled = 0;

        while filled < rec.len() {
            match self.file.read(&mut rec[filled..]) {
                Ok(0) => {
                    tracing::debug!("queue {} closed (EOF)", self.path.display());
                    return Err(IpcError::TransportClosed);
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Message::decode(&rec)?)
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`, returning
    /// `None` when no complete record arrived in time.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>> {
        let deadline = Instant::now() + timeout;
        set_nonblocking(&self.file, true)?;
        let result = self.recv_until(deadline);
        set_nonblocking(&self.file, false)?;
        result
    }

    fn recv_until(&mut self, deadline: Instant) -> Result<Option<Message>> {
        let mut rec = [0u8; Message::WIRE_SIZE];
        let mut filled = 0;

        while filled < rec.len() {
            match self.file.read(&mut rec[filled..]) {
                Ok(0) => return Err(IpcError::TransportClosed),
                Ok(n) => filled += n,
                Err(err)
                    if err.kind() == io::ErrorKind::WouldBlock
                        || err.kind() == io::ErrorKind::Interrupted =>
                {
                    // Never abandon a partial record: once the head of a
                    // message is in, keep draining past the deadline.
                    if filled == 0 && Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(Duration::from_micros(500));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Some(Message::decode(&rec)?))
    }
}

fn set_nonblocking(file: &File, nonblocking: bool) -> Result<()> {
    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(IpcError::Io(io::Error::last_os_error()));
    }
    let flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
        return Err(IpcError::Io(io::Error::last_os_error()));
    }
    Ok(())
}

fn send_to(path: &Path, msg: &Message) -> Result<()> {
    ensure_fifo(path)?;

    // Write-only and non-blocking: a queue with no live reader refuses
    // the record as TransportFull instead of parking the sender, and a
    // full pipe does the same. Callers retry with backoff.
    let mut file = match OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.raw_os_error() == Some(libc::ENXIO) => {
            return Err(IpcError::TransportFull)
        }
        Err(err) => return Err(err.into()),
    };

    let rec = msg.encode()?;
    loop {
        // Records fit in PIPE_BUF, so a non-blocking write is all or
        // nothing; a record is never split between senders.
        match file.write(&rec) {
            Ok(n) if n == rec.len() => return Ok(()),
            Ok(n) => {
                tracing::error!("partial record write ({n} bytes) on {}", path.display());
                return Err(IpcError::TransportClosed);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return Err(IpcError::TransportFull)
            }
            Err(err) => return Err(err.into()),
        }
    }
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
