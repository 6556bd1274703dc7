//! Audio capture and analysis module

mod capture;
mod downmix;
mod fft;
mod level;
mod sources;

pub use capture::{BlockQueue, CaptureError, CpalSource};
pub use downmix::to_mono;
pub use fft::{bin_to_hz, to_color, SpectralAnalyzer};
pub use level::rms;
pub use sources::{find_input_device, list_sources, AudioSource};

use std::time::Duration;

/// Channel layout of the capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

impl TryFrom<u16> for Channels {
    type Error = CaptureError;

    fn try_from(count: u16) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            other => Err(CaptureError::UnsupportedChannels(other)),
        }
    }
}

/// Audio processing configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel layout requested from the device
    pub channels: Channels,

    /// Frames per analysis block
    pub block_size: usize,

    /// Substring of the input device name; `None` uses the default input
    pub device: Option<String>,
}

impl AudioConfig {
    /// Reject settings that could never yield an analysable block
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidSampleRate);
        }
        if self.block_size < 2 {
            return Err(CaptureError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: default_channels(),
            block_size: 1024,
            device: default_device(),
        }
    }
}

// Windows setups route playback through a stereo VB-CABLE loopback device.
#[cfg(target_os = "windows")]
fn default_channels() -> Channels {
    Channels::Stereo
}

#[cfg(not(target_os = "windows"))]
fn default_channels() -> Channels {
    Channels::Mono
}

#[cfg(target_os = "windows")]
fn default_device() -> Option<String> {
    Some("CABLE Output".to_string())
}

#[cfg(not(target_os = "windows"))]
fn default_device() -> Option<String> {
    None
}

/// A running capture stream that hands out fixed-size interleaved blocks.
///
/// Overruns are absorbed by the implementation; the only way to get no block
/// is for `timeout` to elapse, which lets the caller poll for shutdown.
pub trait AudioFrameSource {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> Channels;

    /// Block until `block_size * channels` interleaved samples are available.
    fn next_block(&mut self, timeout: Duration) -> Option<Vec<f32>>;
}
