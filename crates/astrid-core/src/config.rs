//! Host configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default output/input channel count, overridable with `ASTRID_CHANNELS`.
pub const DEFAULT_CHANNELS: usize = 2;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLERATE: usize = 48_000;

/// Default capacity of the shared ADC ring in frames (30 s at 48 kHz).
pub const DEFAULT_ADC_FRAMES: usize = 1_440_000;

/// Configuration shared by every Astrid process.
#[derive(Debug, Clone)]
pub struct AstridConfig {
    pub channels: usize,
    pub samplerate: usize,
    pub adc_frames: usize,
    /// Root directory for id files, queues, and notemaps.
    pub root: PathBuf,
}

impl Default for AstridConfig {
    fn default() -> Self {
        let channels = std::env::var("ASTRID_CHANNELS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHANNELS);

        Self {
            channels,
            samplerate: DEFAULT_SAMPLERATE,
            adc_frames: DEFAULT_ADC_FRAMES,
            root: PathBuf::from("/tmp"),
        }
    }
}

impl AstridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > 64 {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-64)",
                self.channels
            )));
        }
        if self.samplerate < 8000 || self.samplerate > 384_000 {
            return Err(Error::InvalidConfig(format!(
                "samplerate {} out of range (8000-384000 Hz)",
                self.samplerate
            )));
        }
        if self.adc_frames == 0 {
            return Err(Error::InvalidConfig("adc_frames must be nonzero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AstridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samplerate, 48_000);
    }

    #[test]
    fn test_zero_channels_rejected() {
        let config = AstridConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
