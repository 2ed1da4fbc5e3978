//! Filesystem id registry.
//!
//! A well-known file holding one decimal ASCII integer. The creator of a
//! shared resource records its id here; any other process attaches by
//! path. Writes go through a temp file + rename so readers never observe
//! a half-written id. Latest-value MIDI state reuses this directly.

use std::fs;
use std::path::Path;

use crate::error::{IpcError, Result};

/// Atomically record `id` at `path`.
pub fn set_id(path: &Path, id: i64) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    ));

    fs::write(&tmp, id.to_string())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read the id recorded at `path`. Missing file maps to `NotFound` so
/// callers can treat it as "creator may rebuild".
pub fn get_id(path: &Path) -> Result<i64> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(IpcError::NotFound(path.to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };

    raw.trim().parse::<i64>().map_err(|_| {
        IpcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("corrupt id file {}: {raw:?}", path.display()),
        ))
    })
}

/// Remove an id file. Missing file is fine; orphan reclamation calls this
/// without knowing whether the previous owner got that far.
pub fn destroy_id(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-test-id");

        set_id(&path, 12345).unwrap();
        assert_eq!(get_id(&path).unwrap(), 12345);

        set_id(&path, -1).unwrap();
        assert_eq!(get_id(&path).unwrap(), -1);
    }

    #[test]
    fn test_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-missing");
        assert!(matches!(get_id(&path), Err(IpcError::NotFound(_))));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astrid-test-id");
        set_id(&path, 1).unwrap();
        destroy_id(&path).unwrap();
        destroy_id(&path).unwrap();
    }
}
