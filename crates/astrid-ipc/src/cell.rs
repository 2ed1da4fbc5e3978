//! Named shared value cells.
//!
//! A cell is a fixed-size shared memory segment plus one named semaphore
//! guarding it, discoverable by filesystem path. The id registry records
//! the segment size so any process can attach knowing only the path.
//! Orphans left by a crashed creator are reclaimed by the idempotent
//! `create`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{IpcError, Result};
use crate::paths::{posix_name, segment_path};
use crate::registry;
use crate::sem::Semaphore;

/// A shared blob with locked get/set.
pub struct ValueCell {
    map: MmapMut,
    sem: Semaphore,
    size: usize,
    path: PathBuf,
}

impl ValueCell {
    /// Create the cell at `path`, or attach if it already exists.
    pub fn create(path: &Path, size: usize) -> Result<Self> {
        if registry::get_id(path).is_ok() {
            match Self::attach(path) {
                Ok(cell) => return Ok(cell),
                // An id file without its segment is a half-torn-down
                // orphan; rebuild it.
                Err(IpcError::NotFound(_)) => {
                    tracing::warn!("stale id file at {}, rebuilding cell", path.display());
                }
                Err(err) => return Err(err),
            }
        }

        let sem = Semaphore::create(&posix_name(path))?;

        let seg = segment_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&seg)?;
        file.set_len(size as u64).map_err(|err| {
            IpcError::ResourceExhausted(format!("could not size segment {}: {err}", seg.display()))
        })?;

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|err| {
            IpcError::ResourceExhausted(format!("could not map segment {}: {err}", seg.display()))
        })?;

        registry::set_id(path, size as i64)?;

        Ok(Self {
            map,
            sem,
            size,
            path: path.to_path_buf(),
        })
    }

    /// Attach to an existing cell.
    pub fn attach(path: &Path) -> Result<Self> {
        let size = registry::get_id(path)? as usize;
        let sem = Semaphore::open(&posix_name(path))?;

        let seg = segment_path(path);
        let file = match OpenOptions::new().read(true).write(true).open(&seg) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IpcError::NotFound(seg))
            }
            Err(err) => return Err(err.into()),
        };

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|err| {
            IpcError::ResourceExhausted(format!("could not map segment {}: {err}", seg.display()))
        })?;

        Ok(Self {
            map,
            sem,
            size,
            path: path.to_path_buf(),
        })
    }

    /// Size in bytes, which doubles as the registered id.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the cell contents out under the lock.
    pub fn get(&self) -> Result<Vec<u8>> {
        let _guard = self.sem.guard()?;
        Ok(self.map[..self.size].to_vec())
    }

    /// Overwrite the head of the cell under the lock.
    pub fn set(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.size {
            return Err(IpcError::ResourceExhausted(format!(
                "value of {} bytes does not fit cell of {} bytes",
                bytes.len(),
                self.size
            )));
        }
        let _guard = self.sem.guard()?;
        self.map[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Run a read-modify-write on the cell contents while holding the
    /// lock for the whole closure.
    pub fn with_locked<T>(&mut self, f: impl FnOnce(&mut [u8]) -> T) -> Result<T> {
        let _guard = self.sem.guard()?;
        Ok(f(&mut self.map[..self.size]))
    }
}

/// Create a cell and return its registered id.
pub fn create_cell(path: &Path, size: usize) -> Result<i64> {
    let cell = ValueCell::create(path, size)?;
    Ok(cell.size() as i64)
}

/// Write `bytes` into the cell at `path`.
pub fn set_cell(path: &Path, bytes: &[u8]) -> Result<()> {
    ValueCell::attach(path)?.set(bytes)
}

/// Read the full contents of the cell at `path`.
pub fn get_cell(path: &Path) -> Result<Vec<u8>> {
    ValueCell::attach(path)?.get()
}

/// Tear down the cell: segment, id file, and semaphore.
pub fn destroy_cell(path: &Path) -> Result<()> {
    let seg = segment_path(path);
    match std::fs::remove_file(&seg) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    registry::destroy_id(path)?;
    Semaphore::unlink(&posix_name(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-test-cell");

        let mut cell = ValueCell::create(&path, 16).unwrap();
        cell.set(b"hello").unwrap();

        let other = ValueCell::attach(&path).unwrap();
        let bytes = other.get().unwrap();
        assert_eq!(&bytes[..5], b"hello");

        destroy_cell(&path).unwrap();
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-test-cell");

        let mut cell = ValueCell::create(&path, 8).unwrap();
        cell.set(&7u64.to_ne_bytes()).unwrap();

        // Second create attaches instead of clobbering.
        let again = ValueCell::create(&path, 8).unwrap();
        let bytes = again.get().unwrap();
        assert_eq!(u64::from_ne_bytes(bytes[..8].try_into().unwrap()), 7);

        destroy_cell(&path).unwrap();
    }

    #[test]
    fn test_oversized_set_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-test-cell");

        let mut cell = ValueCell::create(&path, 4).unwrap();
        assert!(cell.set(b"too large for four").is_err());

        destroy_cell(&path).unwrap();
    }

    #[test]
    fn test_attach_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-nonexistent");
        assert!(matches!(
            ValueCell::attach(&path),
            Err(IpcError::NotFound(_))
        ));
    }
}
