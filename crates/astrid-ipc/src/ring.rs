//! Shared multichannel audio ring buffer.
//!
//! One writer (the audio callback, pushing input frames) and any number of
//! readers in other processes. The header and sample plane live in one
//! mapped segment; a named semaphore serialises all access. Positions are
//! sample indices in modular space: readers ask for a window `(offset,
//! size)` ending `offset` samples behind the write head.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{IpcError, Result};
use crate::paths::{posix_name, segment_path, Paths};
use crate::registry;
use crate::sem::Semaphore;

const FRAMES_OFF: usize = 0;
const CHANNELS_OFF: usize = 8;
const SAMPLERATE_OFF: usize = 12;
const POS_OFF: usize = 16;
const DATA_OFF: usize = 24;

const SAMPLE_SIZE: usize = std::mem::size_of::<f32>();

/// The shared ADC ring buffer.
pub struct AdcRing {
    map: MmapMut,
    sem: Semaphore,
    path: PathBuf,
    frames: usize,
    channels: usize,
    samplerate: usize,
}

impl AdcRing {
    /// Create the ring registered at `paths.adc()`, or attach to it if the
    /// id file already exists.
    pub fn create(paths: &Paths, frames: usize, channels: usize, samplerate: usize) -> Result<Self> {
        Self::create_at(&paths.adc(), frames, channels, samplerate)
    }

    /// Attach to the ring registered at `paths.adc()`.
    pub fn attach(paths: &Paths) -> Result<Self> {
        Self::attach_at(&paths.adc())
    }

    pub fn create_at(
        id_path: &Path,
        frames: usize,
        channels: usize,
        samplerate: usize,
    ) -> Result<Self> {
        if registry::get_id(id_path).is_ok() {
            tracing::info!("adc ring at {} already exists, attaching", id_path.display());
            return Self::attach_at(id_path);
        }

        let capacity = frames * channels;
        let total = DATA_OFF + capacity * SAMPLE_SIZE;

        let sem = Semaphore::create(&posix_name(id_path))?;

        let seg = segment_path(id_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&seg)?;
        file.set_len(total as u64).map_err(|err| {
            IpcError::ResourceExhausted(format!("could not size ring {}: {err}", seg.display()))
        })?;

        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(|err| {
            IpcError::ResourceExhausted(format!("could not map ring {}: {err}", seg.display()))
        })?;

        write_u64(&mut map, FRAMES_OFF, frames as u64)?;
        write_u32(&mut map, CHANNELS_OFF, channels as u32)?;
        write_u32(&mut map, SAMPLERATE_OFF, samplerate as u32)?;
        write_u64(&mut map, POS_OFF, 0)?;

        registry::set_id(id_path, total as i64)?;

        Ok(Self {
            map,
            sem,
            path: id_path.to_path_buf(),
            frames,
            channels,
            samplerate,
        })
    }

    pub fn attach_at(id_path: &Path) -> Result<Self> {
        registry::get_id(id_path)?;
        let sem = Semaphore::open(&posix_name(id_path))?;

        let seg = segment_path(id_path);
        let file = match OpenOptions::new().read(true).write(true).open(&seg) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IpcError::NotFound(seg))
            }
            Err(err) => return Err(err.into()),
        };

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|err| {
            IpcError::ResourceExhausted(format!("could not map ring {}: {err}", seg.display()))
        })?;

        let frames = read_u64(&map, FRAMES_OFF)?;
        let channels = read_u32(&map, CHANNELS_OFF)?;
        let samplerate = read_u32(&map, SAMPLERATE_OFF)?;

        Ok(Self {
            map,
            sem,
            path: id_path.to_path_buf(),
            frames: frames as usize,
            channels: channels as usize,
            samplerate: samplerate as usize,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samplerate(&self) -> usize {
        self.samplerate
    }

    /// Total capacity in samples.
    pub fn capacity(&self) -> usize {
        self.frames * self.channels
    }

    /// Copy a block of interleaved samples at the write head and advance
    /// it modulo capacity.
    pub fn write_block(&mut self, block: &[f32]) -> Result<()> {
        let cap = self.capacity();
        if block.len() > cap {
            return Err(IpcError::WindowTooLarge {
                requested: block.len(),
                capacity: cap,
            });
        }

        let _guard = self.sem.guard()?;
        let map = &mut self.map;
        let pos = read_u64(map, POS_OFF)?;
        for (i, &sample) in block.iter().enumerate() {
            let idx = (pos as usize + i) % cap;
            put_sample(map, idx, sample)?;
        }
        write_u64(map, POS_OFF, (pos + block.len() as u64) % cap as u64)?;
        Ok(())
    }

    /// Read a window of `out.len()` samples ending `offset` samples
    /// behind the write head.
    ///
    /// The start index is computed in modular space and reduced once, so
    /// a window that reaches past the head of a freshly created ring
    /// wraps instead of underflowing.
    pub fn read_block(&self, offset: usize, out: &mut [f32]) -> Result<()> {
        let cap = self.capacity();
        if out.len() > cap {
            return Err(IpcError::WindowTooLarge {
                requested: out.len(),
                capacity: cap,
            });
        }

        let _guard = self.sem.guard()?;
        let pos = read_u64(&self.map, POS_OFF)?;
        let back = ((offset + out.len()) % cap) as u64;
        let start = (pos + cap as u64 - back) % cap as u64;

        for (i, slot) in out.iter_mut().enumerate() {
            let idx = (start as usize + i) % cap;
            *slot = sample_at(&self.map, idx)?;
        }
        Ok(())
    }

    /// Read the single sample `offset` samples behind the write head.
    pub fn read_sample(&self, offset: usize) -> Result<f32> {
        let mut out = [0.0f32];
        self.read_block(offset, &mut out)?;
        Ok(out[0])
    }

    /// Tear down the ring registered at `paths.adc()`.
    pub fn destroy(paths: &Paths) -> Result<()> {
        Self::destroy_at(&paths.adc())
    }

    pub fn destroy_at(id_path: &Path) -> Result<()> {
        crate::cell::destroy_cell(id_path)
    }
}

// Typed accessors over the mapped bytes. A segment shorter than its
// header claims surfaces as an error here rather than a panic.
fn truncated(off: usize) -> IpcError {
    IpcError::ResourceExhausted(format!("ring segment truncated at byte {off}"))
}

fn field_bytes(map: &[u8], off: usize, len: usize) -> Result<&[u8]> {
    map.get(off..off + len).ok_or_else(|| truncated(off))
}

fn field_bytes_mut(map: &mut [u8], off: usize, len: usize) -> Result<&mut [u8]> {
    map.get_mut(off..off + len).ok_or_else(|| truncated(off))
}

fn read_u64(map: &[u8], off: usize) -> Result<u64> {
    let mut word = [0u8; 8];
    word.copy_from_slice(field_bytes(map, off, 8)?);
    Ok(u64::from_ne_bytes(word))
}

fn write_u64(map: &mut [u8], off: usize, value: u64) -> Result<()> {
    field_bytes_mut(map, off, 8)?.copy_from_slice(&value.to_ne_bytes());
    Ok(())
}

fn read_u32(map: &[u8], off: usize) -> Result<u32> {
    let mut word = [0u8; 4];
    word.copy_from_slice(field_bytes(map, off, 4)?);
    Ok(u32::from_ne_bytes(word))
}

fn write_u32(map: &mut [u8], off: usize, value: u32) -> Result<()> {
    field_bytes_mut(map, off, 4)?.copy_from_slice(&value.to_ne_bytes());
    Ok(())
}

fn sample_at(map: &[u8], idx: usize) -> Result<f32> {
    let mut word = [0u8; SAMPLE_SIZE];
    word.copy_from_slice(field_bytes(map, DATA_OFF + idx * SAMPLE_SIZE, SAMPLE_SIZE)?);
    Ok(f32::from_ne_bytes(word))
}

fn put_sample(map: &mut [u8], idx: usize, sample: f32) -> Result<()> {
    field_bytes_mut(map, DATA_OFF + idx * SAMPLE_SIZE, SAMPLE_SIZE)?
        .copy_from_slice(&sample.to_ne_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(dir: &tempfile::TempDir, frames: usize) -> AdcRing {
        let id_path = dir.path().join("astrid-adc");
        AdcRing::create_at(&id_path, frames, 2, 48000).unwrap()
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut adc = ring(&dir, 8);

        let block: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        adc.write_block(&block).unwrap();

        // Window of the last 4 samples (offset 0).
        let mut out = [0.0f32; 4];
        adc.read_block(0, &mut out).unwrap();
        assert_eq!(out, [5.0, 6.0, 7.0, 8.0]);

        // Offset 2 steps the window back.
        adc.read_block(2, &mut out).unwrap();
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);

        assert_eq!(adc.read_sample(0).unwrap(), 8.0);
        assert_eq!(adc.read_sample(3).unwrap(), 5.0);
    }

    #[test]
    fn test_wraparound() {
        let dir = tempfile::tempdir().unwrap();
        let mut adc = ring(&dir, 4);
        // Capacity is 8 samples; write 12 so the head wraps.
        for chunk in 0..3 {
            let block: Vec<f32> = (0..4).map(|i| (chunk * 4 + i) as f32).collect();
            adc.write_block(&block).unwrap();
        }

        let mut out = [0.0f32; 4];
        adc.read_block(0, &mut out).unwrap();
        assert_eq!(out, [8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_read_past_head_wraps_instead_of_underflowing() {
        let dir = tempfile::tempdir().unwrap();
        let adc = ring(&dir, 4);
        // Nothing written: pos == 0, and a window still resolves.
        let mut out = [0.0f32; 8];
        adc.read_block(3, &mut out).unwrap();
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let adc = ring(&dir, 4);
        let mut out = vec![0.0f32; 9];
        assert!(matches!(
            adc.read_block(0, &mut out),
            Err(IpcError::WindowTooLarge { .. })
        ));
    }

    #[test]
    fn test_attach_sees_writer_state() {
        let dir = tempfile::tempdir().unwrap();
        let id_path = dir.path().join("astrid-adc");
        let mut writer = AdcRing::create_at(&id_path, 8, 2, 48000).unwrap();
        writer.write_block(&[0.5; 6]).unwrap();

        let reader = AdcRing::attach_at(&id_path).unwrap();
        assert_eq!(reader.channels(), 2);
        assert_eq!(reader.read_sample(0).unwrap(), 0.5);

        AdcRing::destroy_at(&id_path).unwrap();
    }
}
