//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device and configuration, and turns the device's
//! callback chunks into fixed-size frames for the session worker.
//!
//! ## Features
//! - Default input device selection
//! - Mono f32 configurations preferred, multi-channel input downmixed
//! - Fixed-size framing independent of the device's callback size

use anyhow::{Result, anyhow, bail};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use log::{debug, error, info};

use crate::session::FrameSource;

/// Default number of samples per analysis frame.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Sample rate requested from the device when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Smallest frame the estimator can do anything useful with.
pub const MIN_BUFFER_SIZE: usize = 4;

/// Capture settings for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Number of samples handed to the estimator per frame.
    pub buffer_size: usize,
    /// Preferred device sample rate in Hz. The closest supported rate is used.
    pub sample_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            bail!(
                "buffer size must be at least {} samples, got {}",
                MIN_BUFFER_SIZE,
                self.buffer_size
            );
        }
        if self.sample_rate == 0 {
            bail!("sample rate must be positive");
        }
        Ok(())
    }
}

/// Collects audio chunks of any length and emits fixed-size frames.
#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    pending: Vec<f32>,
}

impl Framer {
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be positive");
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Appends `data` and calls `emit` once for every complete frame.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        self.pending.extend_from_slice(data);

        // While we have enough data for a full frame, process it.
        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            emit(frame);
        }
    }

    /// Number of samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Averages interleaved multi-channel samples down to one channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// The default system input device as a frame source.
#[derive(Debug, Clone)]
pub struct Microphone {
    config: CaptureConfig,
}

impl Microphone {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl FrameSource for Microphone {
    type Handle = cpal::Stream;

    /// Starts audio capture from the default input device.
    ///
    /// Frames are sent with `try_send`, so a full channel drops frames
    /// instead of blocking the audio callback.
    fn start(self, frames: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        info!("Using audio input device: {}", device.name()?);

        let configs = device.supported_input_configs()?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, self.config.sample_rate)
            .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

        let sample_rate = clamp_sample_rate(&supported_config, self.config.sample_rate);
        let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        info!(
            "Selected sample rate: {} Hz, {} channel(s), {} samples per frame",
            sample_rate, channels, self.config.buffer_size
        );

        let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

        let mut framer = Framer::new(self.config.buffer_size);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix(data, channels);
                framer.push(&mono, |frame| {
                    if frames.try_send(frame).is_err() {
                        debug!("Frame dropped, analysis is falling behind");
                    }
                });
            },
            err_fn,
            None,
        )?;

        stream.play()?;

        Ok((stream, sample_rate))
    }

    fn release(stream: cpal::Stream) {
        if let Err(e) = stream.pause() {
            error!("Error pausing stream: {}", e);
        }
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float configurations are considered. Mono is preferred,
/// then the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32 && c.channels() > 0)
        .min_by_key(|c| {
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_distance)
        })
}

fn clamp_sample_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}
