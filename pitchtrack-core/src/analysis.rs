//! # Frame Analysis Module
//!
//! Runs the pitch estimator on a frame and maps the result onto the nearest
//! note. This is the per-frame step the session worker performs, and the
//! same step used when analysing a recording offline.

use crate::error::EstimateError;
use crate::pitch::{self, PitchEstimate};
use crate::tuning::{self, Note, TuningStatus};
use log::warn;
use serde::Serialize;

/// The note side of a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteReading {
    /// MIDI note number of the nearest note.
    pub number: i32,
    /// Display name, e.g. "C#".
    pub name: &'static str,
    pub octave: i32,
    /// Equal-tempered frequency of the note in Hz.
    pub reference_frequency: f32,
    /// Deviation from the reference in cents (positive = sharp).
    pub cents: i32,
    pub status: TuningStatus,
}

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Reading {
    /// The detected frequency in Hz, `None` when no pitch was found.
    pub frequency: Option<f32>,
    /// The nearest note and the deviation from it.
    pub note: Option<NoteReading>,
}

impl Reading {
    /// Builds a reading from an estimator result.
    pub fn from_estimate(estimate: PitchEstimate) -> Self {
        match estimate.frequency() {
            Some(freq) => {
                let note = Note::nearest(freq);
                let cents = tuning::cents_off_from_pitch(freq, note.number());
                Reading {
                    frequency: Some(freq),
                    note: Some(NoteReading {
                        number: note.number(),
                        name: note.name(),
                        octave: note.octave(),
                        reference_frequency: note.frequency(),
                        cents,
                        status: TuningStatus::from_cents(cents),
                    }),
                }
            }
            None => Reading::default(),
        }
    }

    pub fn has_pitch(&self) -> bool {
        self.frequency.is_some()
    }
}

/// Performs a full analysis on a single frame of audio data.
///
/// # Arguments
/// * `frame` - Raw audio samples (typically 1024 or 2048 samples)
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// * `Ok(Reading)` - Frequency, note and cents, or an empty reading for no pitch
/// * `Err(EstimateError)` - The frame violated the estimator's input contract
pub fn analyze_frame(frame: &[f32], sample_rate: u32) -> Result<Reading, EstimateError> {
    let estimate = pitch::estimate(frame, sample_rate)?;
    Ok(Reading::from_estimate(estimate))
}

/// Analyses a recorded signal frame by frame.
///
/// The signal is cut into consecutive, non-overlapping frames of
/// `buffer_size` samples; a trailing partial frame is dropped. A frame the
/// estimator rejects (for example one holding a NaN) is logged and skipped,
/// the same way a live session treats it.
///
/// # Returns
/// * `Ok(readings)` - One `(start_sample, Reading)` pair per usable frame
/// * `Err(EstimateError)` - `buffer_size` or `sample_rate` is zero
pub fn analyze_signal(
    samples: &[f32],
    sample_rate: u32,
    buffer_size: usize,
) -> Result<Vec<(usize, Reading)>, EstimateError> {
    if buffer_size == 0 {
        return Err(EstimateError::EmptyBuffer);
    }
    if sample_rate == 0 {
        return Err(EstimateError::InvalidSampleRate);
    }
    let readings = samples
        .chunks_exact(buffer_size)
        .enumerate()
        .filter_map(|(i, frame)| {
            let start = i * buffer_size;
            match analyze_frame(frame, sample_rate) {
                Ok(reading) => Some((start, reading)),
                Err(e) => {
                    warn!("Skipping frame at sample {}: {}", start, e);
                    None
                }
            }
        })
        .collect();
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_sine(sample_rate: u32, frequency: f32, sample_count: usize) -> Vec<f32> {
        (0..sample_count)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_no_pitch_gives_empty_reading() {
        let reading = analyze_frame(&[0.0; 1024], 44100).unwrap();
        assert_eq!(reading, Reading::default());
        assert!(!reading.has_pitch());
    }

    #[test]
    fn test_a4_reading() {
        let reading = analyze_frame(&generate_sine(44100, 440.0, 2048), 44100).unwrap();
        let note = reading.note.expect("expected a note");
        assert_eq!(note.number, 69);
        assert_eq!(note.name, "A");
        assert_eq!(note.octave, 4);
        assert_eq!(note.reference_frequency, 440.0);
        assert!(note.cents.abs() < 10, "got {} cents", note.cents);
        assert_eq!(note.status, TuningStatus::InTune);
    }

    #[test]
    fn test_reading_from_estimate() {
        let reading = Reading::from_estimate(PitchEstimate::Pitch(435.0));
        let note = reading.note.unwrap();
        assert_eq!(note.number, 69);
        assert_eq!(note.cents, -20);
        assert_eq!(note.status, TuningStatus::Flat);
    }

    #[test]
    fn test_invalid_frame_is_an_error() {
        assert_eq!(analyze_frame(&[], 44100), Err(EstimateError::EmptyBuffer));
    }

    #[test]
    fn test_analyze_signal_frames() {
        let mut samples = vec![0.0; 1024];
        samples.extend(generate_sine(44100, 220.0, 1024));
        samples.extend(vec![0.0; 100]);

        let readings = analyze_signal(&samples, 44100, 1024).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].0, 0);
        assert!(!readings[0].1.has_pitch());
        assert_eq!(readings[1].0, 1024);
        assert_eq!(readings[1].1.note.as_ref().unwrap().number, 57);
    }

    #[test]
    fn test_analyze_signal_skips_invalid_frames() {
        let mut samples = generate_sine(44100, 440.0, 1024);
        let mut broken = generate_sine(44100, 440.0, 1024);
        broken[300] = f32::NAN;
        samples.extend(broken);
        samples.extend(generate_sine(44100, 220.0, 1024));

        let readings = analyze_signal(&samples, 44100, 1024).unwrap();
        let starts: Vec<usize> = readings.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![0, 2048]);
        assert!(readings.iter().all(|(_, reading)| reading.has_pitch()));
    }

    #[test]
    fn test_analyze_signal_rejects_bad_arguments() {
        assert_eq!(analyze_signal(&[0.0; 16], 44100, 0), Err(EstimateError::EmptyBuffer));
        assert_eq!(analyze_signal(&[0.0; 16], 0, 8), Err(EstimateError::InvalidSampleRate));
    }

    #[test]
    fn test_reading_serializes() {
        let reading = Reading::from_estimate(PitchEstimate::Pitch(445.0));
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["note"]["name"], "A");
        assert_eq!(json["note"]["status"], "sharp");
        assert_eq!(json["note"]["cents"], 19);

        let json = serde_json::to_value(Reading::default()).unwrap();
        assert!(json["frequency"].is_null());
        assert!(json["note"].is_null());
    }
}
