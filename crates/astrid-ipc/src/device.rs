//! Default audio device selection, shared through the id registry.

use crate::error::{IpcError, Result};
use crate::paths::Paths;
use crate::registry;

/// The current playback device id. First read pins the default (0) so
/// every process agrees from then on.
pub fn playback_device_id(paths: &Paths) -> Result<i64> {
    let path = paths.device_id();
    match registry::get_id(&path) {
        Ok(id) => Ok(id),
        Err(IpcError::NotFound(_)) => {
            registry::set_id(&path, 0)?;
            Ok(0)
        }
        Err(err) => Err(err),
    }
}

pub fn set_playback_device_id(paths: &Paths, id: i64) -> Result<()> {
    registry::set_id(&paths.device_id(), id)
}

// TODO: per-process capture device selection; for now capture follows
// playback.
pub fn capture_device_id(paths: &Paths) -> Result<i64> {
    playback_device_id(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_read_pins_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        assert_eq!(playback_device_id(&paths).unwrap(), 0);
        set_playback_device_id(&paths, 3).unwrap();
        assert_eq!(playback_device_id(&paths).unwrap(), 3);
        assert_eq!(capture_device_id(&paths).unwrap(), 3);
    }
}
