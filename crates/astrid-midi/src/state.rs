//! Latest-value MIDI state.
//!
//! One id file per `(device, cc)` and `(device, note)`. Getters are
//! total: a path that has never been written reads as zero and is
//! initialised on the way out.

use astrid_ipc::{registry, IpcError, Paths, Result};

pub fn set_cc(paths: &Paths, device_id: u32, cc: u32, value: i64) -> Result<()> {
    registry::set_id(&paths.midi_cc(device_id, cc), value)
}

pub fn get_cc(paths: &Paths, device_id: u32, cc: u32) -> Result<i64> {
    read_or_init(&paths.midi_cc(device_id, cc))
}

pub fn set_note(paths: &Paths, device_id: u32, note: u32, velocity: i64) -> Result<()> {
    registry::set_id(&paths.midi_note(device_id, note), velocity)
}

pub fn get_note(paths: &Paths, device_id: u32, note: u32) -> Result<i64> {
    read_or_init(&paths.midi_note(device_id, note))
}

fn read_or_init(path: &std::path::Path) -> Result<i64> {
    match registry::get_id(path) {
        Ok(value) => Ok(value),
        Err(IpcError::NotFound(_)) => {
            registry::set_id(path, 0)?;
            Ok(0)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_cc() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        set_cc(&paths, 0, 21, 96).unwrap();
        assert_eq!(get_cc(&paths, 0, 21).unwrap(), 96);
    }

    #[test]
    fn test_get_uninitialised_returns_zero_and_initialises() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        assert_eq!(get_note(&paths, 1, 60).unwrap(), 0);
        // The cell now exists on disk.
        assert!(paths.midi_note(1, 60).exists());
    }

    #[test]
    fn test_devices_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());

        set_note(&paths, 0, 60, 127).unwrap();
        set_note(&paths, 1, 60, 64).unwrap();
        assert_eq!(get_note(&paths, 0, 60).unwrap(), 127);
        assert_eq!(get_note(&paths, 1, 60).unwrap(), 64);
    }
}
