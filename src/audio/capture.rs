//! Audio capture implementation backed by a cpal input stream

use super::{sources, AudioConfig, AudioFrameSource, Channels};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Number of blocks buffered before the oldest audio is discarded
const MAX_QUEUED_BLOCKS: usize = 8;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to enumerate devices: {0}")]
    EnumerationError(String),

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),

    #[error("Block size must be at least 2 frames, got {0}")]
    InvalidBlockSize(usize),

    #[error("Sample rate must be non-zero")]
    InvalidSampleRate,

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),
}

struct QueueInner {
    samples: VecDeque<f32>,
    overruns: u64,
}

/// Bounded FIFO of interleaved samples shared with the capture callback.
///
/// The callback pushes whatever the backend delivers; the reader blocks until
/// a whole block is queued. When the reader falls behind, the oldest whole
/// frames are dropped so channel alignment survives the overrun.
pub struct BlockQueue {
    inner: Mutex<QueueInner>,
    ready: Condvar,
    channels: usize,
    capacity: usize,
}

impl BlockQueue {
    pub fn new(block_samples: usize, channels: Channels, max_blocks: usize) -> Self {
        let capacity = block_samples * max_blocks.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                samples: VecDeque::with_capacity(capacity),
                overruns: 0,
            }),
            ready: Condvar::new(),
            channels: channels.count(),
            capacity,
        }
    }

    pub fn push_samples(&self, data: &[f32]) {
        {
            let mut inner = self.inner.lock();
            inner.samples.extend(data.iter().copied());

            let len = inner.samples.len();
            if len > self.capacity {
                let excess_frames = (len - self.capacity).div_ceil(self.channels);
                let discard = (excess_frames * self.channels).min(len);
                inner.samples.drain(..discard);
                inner.overruns += 1;
            }
        }
        self.ready.notify_one();
    }

    /// Remove exactly `count` samples, waiting up to `timeout` for them.
    pub fn pop_block(&self, count: usize, timeout: Duration) -> Option<Vec<f32>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        while inner.samples.len() < count {
            if self.ready.wait_until(&mut inner, deadline).timed_out()
                && inner.samples.len() < count
            {
                return None;
            }
        }

        Some(inner.samples.drain(..count).collect())
    }

    /// Number of times queued audio has been discarded
    pub fn overruns(&self) -> u64 {
        self.inner.lock().overruns
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }
}

/// Live capture source. Dropping it stops and releases the device stream.
pub struct CpalSource {
    stream: cpal::Stream,
    queue: Arc<BlockQueue>,
    sample_rate: u32,
    channels: Channels,
    block_samples: usize,
    seen_overruns: u64,
}

impl CpalSource {
    /// Resolve the configured device and start capturing.
    pub fn open(config: &AudioConfig) -> Result<Self, CaptureError> {
        config.validate()?;

        let host = cpal::default_host();
        let device = sources::find_input_device(&host, config.device.as_deref())?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using input device: {}", device_name);

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

        let stream_config = StreamConfig {
            channels: config.channels.count() as u16,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let block_samples = config.block_size * config.channels.count();
        let queue = Arc::new(BlockQueue::new(
            block_samples,
            config.channels,
            MAX_QUEUED_BLOCKS,
        ));

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, queue.clone()),
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, queue.clone()),
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, queue.clone()),
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        }
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::PlayError(e.to_string()))?;

        log::info!(
            "Audio capture started: {} Hz, {} channel(s), {} frames per block",
            config.sample_rate,
            config.channels.count(),
            config.block_size
        );

        Ok(Self {
            stream,
            queue,
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_samples,
            seen_overruns: 0,
        })
    }
}

impl AudioFrameSource for CpalSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> Channels {
        self.channels
    }

    fn next_block(&mut self, timeout: Duration) -> Option<Vec<f32>> {
        let block = self.queue.pop_block(self.block_samples, timeout);

        let overruns = self.queue.overruns();
        if overruns != self.seen_overruns {
            log::debug!(
                "Capture overrun: {} buffer(s) discarded",
                overruns - self.seen_overruns
            );
            self.seen_overruns = overruns;
        }

        block
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::warn!("Failed to pause audio stream: {}", e);
        }
        log::info!("Audio capture stopped");
    }
}

/// Build audio stream for given sample type
fn build_stream<T: cpal::Sample + cpal::SizedSample>(
    device: &Device,
    config: &StreamConfig,
    queue: Arc<BlockQueue>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    f32: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let f32_data: Vec<f32> = data
                .iter()
                .map(|s| cpal::Sample::from_sample(*s))
                .collect();

            queue.push_samples(&f32_data);
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )
}
