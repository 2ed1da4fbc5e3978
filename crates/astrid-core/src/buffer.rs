//! Owned interleaved audio buffers.

use std::fmt;

/// An owned block of rendered audio.
///
/// Samples are interleaved: frame `f`, channel `c` lives at
/// `data[f * channels + c]`. `onset` and `is_looping` ride along for the
/// wire format; playback position is tracked by the scheduler event that
/// owns the buffer, not here.
#[derive(Clone, PartialEq)]
pub struct Buffer {
    pub data: Vec<f32>,
    pub channels: usize,
    pub samplerate: usize,
    pub is_looping: bool,
    pub onset: u64,
}

impl Buffer {
    /// A zero-length placeholder, used when recycling scheduler events.
    pub fn empty(channels: usize, samplerate: usize) -> Self {
        Self {
            data: Vec::new(),
            channels,
            samplerate,
            is_looping: false,
            onset: 0,
        }
    }

    pub fn silence(frames: usize, channels: usize, samplerate: usize) -> Self {
        Self {
            data: vec![0.0; frames * channels],
            channels,
            samplerate,
            is_looping: false,
            onset: 0,
        }
    }

    pub fn from_frames(data: Vec<f32>, channels: usize, samplerate: usize) -> Self {
        debug_assert!(channels > 0 && data.len() % channels == 0);
        Self {
            data,
            channels,
            samplerate,
            is_looping: false,
            onset: 0,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    /// Sample at `(frame, channel)` with modular channel mapping, the same
    /// mapping the mixer uses when a buffer is narrower than the output.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.data[frame * self.channels + (channel % self.channels)]
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("frames", &self.frames())
            .field("channels", &self.channels)
            .field("samplerate", &self.samplerate)
            .field("is_looping", &self.is_looping)
            .field("onset", &self.onset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames() {
        let buf = Buffer::silence(64, 2, 48000);
        assert_eq!(buf.frames(), 64);
        assert_eq!(buf.data.len(), 128);
    }

    #[test]
    fn test_modular_channel_mapping() {
        let buf = Buffer::from_frames(vec![1.0, 2.0, 3.0], 1, 48000);
        assert_eq!(buf.sample(1, 0), 2.0);
        assert_eq!(buf.sample(1, 1), 2.0);
    }
}
