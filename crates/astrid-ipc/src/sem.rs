//! Named POSIX semaphores used as cross-process mutexes.
//!
//! Every shared cell pairs with exactly one binary semaphore; readers and
//! writers take it around the copy. Locks are released on every exit path
//! via [`SemGuard`].

use std::io;
use std::time::Duration;

use crate::error::{IpcError, Result};

const SEM_PERMS: libc::mode_t = 0o644;

/// A named binary semaphore.
pub struct Semaphore {
    sem: *mut libc::sem_t,
    name: String,
}

// The sem_t handle is a process-local mapping of a kernel object; the
// kernel serialises operations on it.
unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Open the semaphore at `name`, creating it with an initial value of
    /// one if it does not exist yet.
    pub fn create(name: &str) -> Result<Self> {
        Self::open_flags(name, libc::O_CREAT, 1)
    }

    /// Open an existing semaphore.
    pub fn open(name: &str) -> Result<Self> {
        Self::open_flags(name, 0, 0)
    }

    fn open_flags(name: &str, flags: libc::c_int, initial: libc::c_uint) -> Result<Self> {
        let c_name = cstring(name)?;
        let sem =
            unsafe { libc::sem_open(c_name.as_ptr(), flags, SEM_PERMS as libc::c_uint, initial) };
        if sem == libc::SEM_FAILED {
            return Err(IpcError::Sem {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    /// Block until the lock is held. `EINTR` is retried transparently.
    pub fn wait(&self) -> Result<()> {
        loop {
            let rc = unsafe { libc::sem_wait(self.sem) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(IpcError::Sem {
                name: self.name.clone(),
                source: err,
            });
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, mapping
    /// expiry to [`IpcError::LockTimeout`] so callers cannot deadlock on a
    /// crashed lock holder.
    pub fn timed_wait(&self, timeout: Duration) -> Result<()> {
        let mut ts = std::mem::MaybeUninit::<libc::timespec>::uninit();
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, ts.as_mut_ptr()) };
        if rc != 0 {
            return Err(IpcError::Io(io::Error::last_os_error()));
        }
        let mut ts = unsafe { ts.assume_init() };

        ts.tv_sec += timeout.as_secs() as libc::time_t;
        ts.tv_nsec += timeout.subsec_nanos() as libc::c_long;
        if ts.tv_nsec >= 1_000_000_000 {
            ts.tv_sec += 1;
            ts.tv_nsec -= 1_000_000_000;
        }

        loop {
            let rc = unsafe { libc::sem_timedwait(self.sem, &ts) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return Err(IpcError::LockTimeout(self.name.clone())),
                _ => {
                    return Err(IpcError::Sem {
                        name: self.name.clone(),
                        source: err,
                    })
                }
            }
        }
    }

    /// Release the lock.
    pub fn post(&self) -> Result<()> {
        let rc = unsafe { libc::sem_post(self.sem) };
        if rc != 0 {
            return Err(IpcError::Sem {
                name: self.name.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Take the lock and release it when the guard drops.
    pub fn guard(&self) -> Result<SemGuard<'_>> {
        self.wait()?;
        Ok(SemGuard { sem: self })
    }

    /// Remove the named semaphore from the system. Missing names are fine.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = cstring(name)?;
        let rc = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Ok(());
            }
            return Err(IpcError::Sem {
                name: name.to_string(),
                source: err,
            });
        }
        Ok(())
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

/// RAII lock guard over a [`Semaphore`].
pub struct SemGuard<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.sem.post() {
            tracing::error!("failed to release semaphore: {err}");
        }
    }
}

fn cstring(name: &str) -> Result<std::ffi::CString> {
    std::ffi::CString::new(name).map_err(|_| {
        IpcError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("interior NUL in semaphore name {name:?}"),
        ))
    })
}
