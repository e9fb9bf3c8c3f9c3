//! # Pitch Detection Module
//!
//! This module implements the time-domain pitch estimator used by the tracker.
//! It compares the signal against shifted copies of itself and picks the lag
//! at which the copy lines up best.
//!
//! ## Features
//! - RMS noise gate to reject silence
//! - Difference-based autocorrelation over half the buffer
//! - Rising-edge peak picking with early exit once the first peak is passed
//! - Shift interpolation for sub-sample accuracy

use crate::error::EstimateError;

/// Minimum RMS energy a buffer needs before a pitch is searched for.
pub const RMS_THRESHOLD: f32 = 0.01;

/// The "bar" a lag's correlation has to clear to count as a good match.
pub const GOOD_ENOUGH_CORRELATION: f32 = 0.9;

/// Lowest best correlation accepted when the scan runs to the end
/// without passing a peak.
pub const MIN_CORRELATION: f32 = 0.01;

/// Scale applied to the neighbour shift when refining the best lag.
pub const INTERPOLATION_SCALE: f32 = 8.0;

/// Result of a single estimation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Detected fundamental frequency in Hz. Always finite and > 0.
    Pitch(f32),
    /// The buffer was too quiet or no confident match was found.
    NoPitch,
}

impl PitchEstimate {
    /// Returns the frequency in Hz, or `None` for [`PitchEstimate::NoPitch`].
    pub fn frequency(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Pitch(freq) => Some(freq),
            PitchEstimate::NoPitch => None,
        }
    }

    pub fn is_pitch(&self) -> bool {
        matches!(self, PitchEstimate::Pitch(_))
    }

    /// Wraps a raw frequency, turning anything non-finite or non-positive
    /// into `NoPitch`.
    fn from_frequency(freq: f32) -> Self {
        if freq.is_finite() && freq > 0.0 {
            PitchEstimate::Pitch(freq)
        } else {
            PitchEstimate::NoPitch
        }
    }
}

/// How the correlation scan ended.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanOutcome {
    /// The signal never got past the noise gate.
    Quiet,
    /// A good match was found and the scan passed its peak.
    PeakPassed { best_offset: usize },
    /// The scan ran through every lag.
    Exhausted {
        best_offset: Option<usize>,
        best_correlation: f32,
    },
}

/// Working state of one estimation call. `profile` has one slot per lag;
/// slots past an early exit stay at zero. It is dropped with the scan.
#[derive(Debug)]
struct Scan {
    profile: Vec<f32>,
    outcome: ScanOutcome,
}

/// Estimates the fundamental frequency of a buffer of audio samples.
///
/// The buffer is first gated on its RMS energy. Each lag in `[0, N/2)` is then
/// scored with `1 - mean(|x[i] - x[i + lag]|)` over the first half of the
/// buffer. A lag becomes a candidate once its score is above
/// [`GOOD_ENOUGH_CORRELATION`] and higher than the previous lag's score. As
/// soon as the scores stop rising after a candidate was seen, the best lag is
/// refined from its two neighbours and converted to Hz.
///
/// # Arguments
/// * `buffer` - Input audio samples, nominally in `[-1.0, 1.0]`
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// * `Ok(PitchEstimate::Pitch(freq))` - Detected frequency in Hz
/// * `Ok(PitchEstimate::NoPitch)` - Silence or no confident match
/// * `Err(EstimateError)` - Empty buffer, zero sample rate or non-finite samples
pub fn estimate(buffer: &[f32], sample_rate: u32) -> Result<PitchEstimate, EstimateError> {
    validate(buffer, sample_rate)?;

    let scan = scan(buffer);
    let sample_rate = sample_rate as f32;

    let estimate = match scan.outcome {
        ScanOutcome::Quiet => PitchEstimate::NoPitch,
        ScanOutcome::PeakPassed { best_offset } => {
            // best_offset >= 1 and a later lag was scored, so both neighbours exist.
            let profile = &scan.profile;
            let shift = (profile[best_offset + 1] - profile[best_offset - 1]) / profile[best_offset];
            PitchEstimate::from_frequency(
                sample_rate / (best_offset as f32 + INTERPOLATION_SCALE * shift),
            )
        }
        ScanOutcome::Exhausted {
            best_offset: Some(best_offset),
            best_correlation,
        } if best_correlation > MIN_CORRELATION => {
            PitchEstimate::from_frequency(sample_rate / best_offset as f32)
        }
        ScanOutcome::Exhausted { .. } => PitchEstimate::NoPitch,
    };

    Ok(estimate)
}

fn validate(buffer: &[f32], sample_rate: u32) -> Result<(), EstimateError> {
    if buffer.is_empty() {
        return Err(EstimateError::EmptyBuffer);
    }
    if sample_rate == 0 {
        return Err(EstimateError::InvalidSampleRate);
    }
    if let Some(index) = buffer.iter().position(|s| !s.is_finite()) {
        return Err(EstimateError::NonFiniteSample { index });
    }
    Ok(())
}

/// Root-mean-square energy of a buffer.
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    (buffer.iter().map(|&s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
}

fn scan(buffer: &[f32]) -> Scan {
    let max_samples = buffer.len() / 2;
    let mut profile = vec![0.0; max_samples];

    // --- Noise Gate ---
    if rms(buffer) < RMS_THRESHOLD {
        return Scan {
            profile,
            outcome: ScanOutcome::Quiet,
        };
    }

    let mut best_offset = None;
    let mut best_correlation = 0.0;
    let mut found_good_correlation = false;
    let mut last_correlation = 1.0;

    for offset in 0..max_samples {
        let difference: f32 = buffer[..max_samples]
            .iter()
            .zip(&buffer[offset..offset + max_samples])
            .map(|(a, b)| (a - b).abs())
            .sum();
        let correlation = 1.0 - difference / max_samples as f32;
        profile[offset] = correlation;

        if correlation > GOOD_ENOUGH_CORRELATION && correlation > last_correlation {
            found_good_correlation = true;
            if correlation > best_correlation {
                best_correlation = correlation;
                best_offset = Some(offset);
            }
        } else if found_good_correlation {
            // Past the first peak; later lags only see copies of it.
            if let Some(best_offset) = best_offset {
                return Scan {
                    profile,
                    outcome: ScanOutcome::PeakPassed { best_offset },
                };
            }
        }
        last_correlation = correlation;
    }

    Scan {
        profile,
        outcome: ScanOutcome::Exhausted {
            best_offset,
            best_correlation,
        },
    }
}
