//! Reading recorded audio from WAV files.

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader};
use log::debug;
use std::path::Path;

use crate::audio::downmix;

/// Reads a WAV file as mono samples in `[-1.0, 1.0]`.
///
/// Integer files of up to 32 bits and 32-bit float files are supported.
/// Multi-channel files are downmixed by averaging.
///
/// # Returns
/// * `Ok((samples, sample_rate))` - Mono samples and the file's sample rate in Hz
/// * `Err(e)` - The file could not be opened or decoded
pub fn read_mono(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    debug!(
        "{}: {} Hz, {} channel(s), {} bit {:?}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                bail!("unsupported float WAV bit depth: {}", spec.bits_per_sample);
            }
            reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("failed to decode WAV samples")?
        }
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported integer WAV bit depth: {}", spec.bits_per_sample);
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to decode WAV samples")?
        }
    };

    Ok((downmix(&interleaved, spec.channels as usize), spec.sample_rate))
}
