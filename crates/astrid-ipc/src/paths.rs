//! Deterministic filesystem paths for every shared resource.
//!
//! All IPC state hangs off one configurable root (default `/tmp`), so
//! tests can isolate a whole host under a temporary directory. Instrument
//! names are validated before being interpolated into any path.

use std::path::{Path, PathBuf};

use astrid_core::validate_instrument_name;

use crate::error::Result;

/// Path builder for a single Astrid deployment.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp"),
        }
    }
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file(&self, name: &str) -> PathBuf {
        self.root.join(format!("astrid-{name}"))
    }

    /// Id file for the global voice counter.
    pub fn voice_counter(&self) -> PathBuf {
        self.file("voice-id")
    }

    /// The broker control queue every producer writes into.
    pub fn broker_queue(&self) -> PathBuf {
        self.file("msgq")
    }

    /// Per-instrument play queue. Rejects names with separators.
    pub fn play_queue(&self, instrument_name: &str) -> Result<PathBuf> {
        validate_instrument_name(instrument_name)?;
        Ok(self.file(&format!("playq-{instrument_name}")))
    }

    /// Id file for the shared ADC ring buffer.
    pub fn adc(&self) -> PathBuf {
        self.file("adc")
    }

    /// Id file for the default audio device selection.
    pub fn device_id(&self) -> PathBuf {
        self.file("device-id")
    }

    pub fn midi_cc(&self, device_id: u32, cc: u32) -> PathBuf {
        self.file(&format!("midi-cc-{device_id}-{cc}"))
    }

    pub fn midi_note(&self, device_id: u32, note: u32) -> PathBuf {
        self.file(&format!("midi-note-{device_id}-{note}"))
    }

    pub fn notemap(&self, device_id: u32, note: u32) -> PathBuf {
        self.file(&format!("midimap-note-{device_id}-{note}"))
    }
}

/// The mmap segment file backing a cell, a sibling of its id file.
pub fn segment_path(id_path: &Path) -> PathBuf {
    let mut os = id_path.as_os_str().to_os_string();
    os.push("-shm");
    PathBuf::from(os)
}

/// Derive a named-semaphore (or POSIX mq) name from a filesystem path.
///
/// POSIX names must start with `/` and contain no other slash, so the
/// path's separators are folded into dashes. The mapping is deterministic:
/// the same cell path always reaches the same semaphore from any process.
pub fn posix_name(path: &Path) -> String {
    let flat: String = path
        .to_string_lossy()
        .trim_start_matches('/')
        .chars()
        .map(|c| if c == '/' { '-' } else { c })
        .collect();
    format!("/{flat}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = Paths::default();
        assert_eq!(paths.broker_queue(), PathBuf::from("/tmp/astrid-msgq"));
        assert_eq!(
            paths.play_queue("pulsar").unwrap(),
            PathBuf::from("/tmp/astrid-playq-pulsar")
        );
        assert_eq!(
            paths.midi_cc(0, 21),
            PathBuf::from("/tmp/astrid-midi-cc-0-21")
        );
        assert_eq!(
            paths.notemap(0, 60),
            PathBuf::from("/tmp/astrid-midimap-note-0-60")
        );
    }

    #[test]
    fn test_play_queue_rejects_separators() {
        let paths = Paths::default();
        assert!(paths.play_queue("../sneaky").is_err());
        assert!(paths.play_queue("a/b").is_err());
    }

    #[test]
    fn test_posix_name_has_single_slash() {
        let name = posix_name(Path::new("/tmp/astrid-voice-id"));
        assert_eq!(name, "/tmp-astrid-voice-id");
        assert_eq!(name.matches('/').count(), 1);
    }

    #[test]
    fn test_segment_path_is_sibling() {
        let seg = segment_path(Path::new("/tmp/astrid-adc"));
        assert_eq!(seg, PathBuf::from("/tmp/astrid-adc-shm"));
    }
}
