//! Shared monotonic counter, the source of voice ids.

use std::path::Path;

use crate::cell::{destroy_cell, ValueCell};
use crate::error::{IpcError, Result};

const COUNTER_SIZE: usize = std::mem::size_of::<u64>();

/// A cross-process counter with atomic read-and-increment.
///
/// The value starts at one. For any N concurrent `read_and_increment`
/// calls across processes, each caller observes a distinct value and the
/// union is `{start .. start + N - 1}`.
pub struct Counter {
    cell: ValueCell,
}

impl Counter {
    /// Create the counter at `path`, or attach if it already exists.
    pub fn create(path: &Path) -> Result<Self> {
        let fresh = crate::registry::get_id(path).is_err()
            || !crate::paths::segment_path(path).exists();
        let mut cell = ValueCell::create(path, COUNTER_SIZE)?;
        if fresh {
            cell.set(&1u64.to_ne_bytes())?;
        }
        Self::from_cell(cell)
    }

    /// Attach to an existing counter.
    pub fn attach(path: &Path) -> Result<Self> {
        Self::from_cell(ValueCell::attach(path)?)
    }

    fn from_cell(cell: ValueCell) -> Result<Self> {
        if cell.size() < COUNTER_SIZE {
            return Err(IpcError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "counter cell {} is {} bytes, expected {COUNTER_SIZE}",
                    cell.path().display(),
                    cell.size()
                ),
            )));
        }
        Ok(Self { cell })
    }

    /// Return the current value and increment it, atomically across
    /// processes.
    pub fn read_and_increment(&mut self) -> Result<u64> {
        self.cell.with_locked(|bytes| {
            let mut word = [0u8; COUNTER_SIZE];
            word.copy_from_slice(&bytes[..COUNTER_SIZE]);
            let value = u64::from_ne_bytes(word);
            bytes[..COUNTER_SIZE].copy_from_slice(&(value + 1).to_ne_bytes());
            value
        })
    }

    /// Tear down the counter at `path`.
    pub fn destroy(path: &Path) -> Result<()> {
        destroy_cell(path)
    }
}
