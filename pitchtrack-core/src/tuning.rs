//! # Musical Tuning Module
//!
//! This module maps frequencies onto the 12-tone equal-tempered scale.
//! Notes are identified by their MIDI note number, referenced to A4 = 440 Hz
//! = note 69, and are not range-restricted.
//!
//! ## Features
//! - Frequency to nearest note number and back
//! - Cent deviation between a frequency and a note's reference pitch
//! - Note names and octaves, defined for negative note numbers too
//! - Flat / sharp / in-tune classification of a cent deviation

use serde::Serialize;
use std::fmt;

/// Reference frequency of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_NOTE: i32 = 69;

/// Readings strictly inside `(-IN_TUNE_CENTS, IN_TUNE_CENTS)` count as in tune.
pub const IN_TUNE_CENTS: i32 = 10;

/// Display names, indexed by `note_number mod 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Finds the nearest equal-tempered note to a frequency.
///
/// The logarithm is taken in `f64`, so rounding near a semitone boundary
/// matches double-precision tuners.
///
/// The caller must pass a positive, finite frequency; the logarithm is
/// undefined otherwise.
///
/// # Arguments
/// * `freq` - Frequency in Hz
///
/// # Returns
/// * MIDI note number of the nearest semitone
pub fn note_from_frequency(freq: f32) -> i32 {
    let semitones = 12.0 * (freq as f64 / A4_FREQUENCY as f64).log2();
    // Halves round up, towards positive infinity. The cast saturates.
    ((semitones + 0.5).floor() + A4_NOTE as f64) as i32
}

/// Reference frequency of a note in Hz.
///
/// # Arguments
/// * `note` - MIDI note number
///
/// # Returns
/// * `440 * 2^((note - 69) / 12)`
pub fn frequency_from_note(note: i32) -> f32 {
    (A4_FREQUENCY as f64 * 2.0_f64.powf((note as f64 - A4_NOTE as f64) / 12.0)) as f32
}

/// Calculates how far a frequency is from a note's reference, in whole cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// The result is floored, so a reading a fraction of a cent flat reports -1.
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `note` - MIDI note number to compare against
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn cents_off_from_pitch(freq: f32, note: i32) -> i32 {
    // Compared against the same f32 reference callers see, so a reference
    // frequency is exactly 0 cents off its own note.
    (1200.0 * (freq as f64 / frequency_from_note(note) as f64).log2()).floor() as i32
}

/// Display name of a note, e.g. `"C#"`.
///
/// Uses floored modulo, so note -1 is `"B"` and note -12 is `"C"`.
pub fn note_name(note: i32) -> &'static str {
    NOTE_NAMES[note.rem_euclid(12) as usize]
}

/// Scientific pitch octave of a note, where note 60 is C4.
pub fn octave(note: i32) -> i32 {
    note.div_euclid(12) - 1
}

/// A note of the chromatic scale, identified by its MIDI note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note(pub i32);

impl Note {
    /// The note nearest to `freq`.
    pub fn nearest(freq: f32) -> Self {
        Note(note_from_frequency(freq))
    }

    pub fn number(self) -> i32 {
        self.0
    }

    pub fn name(self) -> &'static str {
        note_name(self.0)
    }

    pub fn octave(self) -> i32 {
        octave(self.0)
    }

    /// Equal-tempered reference frequency in Hz.
    pub fn frequency(self) -> f32 {
        frequency_from_note(self.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

/// Whether a reading sits below, above, or close to its note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningStatus {
    Flat,
    InTune,
    Sharp,
}

impl TuningStatus {
    /// Classifies a cent deviation.
    ///
    /// Anything within [`IN_TUNE_CENTS`] of the reference is in tune; otherwise
    /// negative deviations are flat and the rest sharp.
    pub fn from_cents(cents: i32) -> Self {
        if cents > -IN_TUNE_CENTS && cents < IN_TUNE_CENTS {
            TuningStatus::InTune
        } else if cents < 0 {
            TuningStatus::Flat
        } else {
            TuningStatus::Sharp
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TuningStatus::Flat => "FLAT",
            TuningStatus::InTune => "IN TUNE",
            TuningStatus::Sharp => "SHARP",
        }
    }
}

impl fmt::Display for TuningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4() {
        assert_eq!(note_from_frequency(440.0), 69);
        assert_eq!(69 % 12, 9);
        assert_eq!(note_name(69), "A");
        assert_eq!(frequency_from_note(69), 440.0);
        assert_eq!(Note(69).to_string(), "A4");
    }

    #[test]
    fn test_known_notes() {
        assert_eq!(note_from_frequency(261.63), 60);
        assert_eq!(Note(60).to_string(), "C4");
        assert_eq!(note_from_frequency(27.5), 21);
        assert_eq!(Note(21).to_string(), "A0");
        assert_eq!(note_from_frequency(880.0), 81);
        assert!((frequency_from_note(57) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_cents_at_reference_is_zero() {
        for note in -24..=140 {
            assert_eq!(cents_off_from_pitch(frequency_from_note(note), note), 0, "note {}", note);
        }
    }

    #[test]
    fn test_sharp_and_flat_cents() {
        let sharp = cents_off_from_pitch(445.0, 69);
        assert!(sharp > 0 && sharp < 50, "got {}", sharp);
        assert_eq!(sharp, 19);

        let flat = cents_off_from_pitch(435.0, 69);
        assert!(flat < 0 && flat > -50, "got {}", flat);
        assert_eq!(flat, -20);
    }

    #[test]
    fn test_round_trip_within_a_semitone() {
        let semitone = 2.0_f32.powf(1.0 / 12.0);
        let mut freq = 8.0_f32;
        while freq < 12000.0 {
            let reference = frequency_from_note(note_from_frequency(freq));
            let ratio = freq / reference;
            assert!(
                ratio < semitone && ratio > 1.0 / semitone,
                "{} Hz mapped to {} Hz",
                freq,
                reference
            );
            freq *= 1.037;
        }
    }

    #[test]
    fn test_extreme_note_numbers() {
        assert_eq!(frequency_from_note(i32::MIN), 0.0);
        assert!(frequency_from_note(i32::MAX).is_infinite());
        assert_eq!(cents_off_from_pitch(440.0, i32::MIN + 10), i32::MAX);
        assert_eq!(cents_off_from_pitch(440.0, i32::MAX), i32::MIN);
        assert_eq!(note_name(i32::MIN), NOTE_NAMES[i32::MIN.rem_euclid(12) as usize]);
        assert_eq!(note_name(i32::MAX), NOTE_NAMES[i32::MAX.rem_euclid(12) as usize]);
        assert_eq!(octave(i32::MIN), i32::MIN.div_euclid(12) - 1);
    }

    #[test]
    fn test_out_of_domain_frequencies_saturate() {
        assert_eq!(note_from_frequency(f32::INFINITY), i32::MAX);
        assert_eq!(note_from_frequency(0.0), i32::MIN);
    }

    #[test]
    fn test_semitone_boundary_in_double_precision() {
        // The A4 / A#4 boundary is 440 * 2^(1/24) ~ 452.893 Hz.
        assert_eq!(note_from_frequency(452.8), 69);
        assert_eq!(note_from_frequency(452.9), 70);
        assert_eq!(cents_off_from_pitch(452.8, 69), 49);
        assert_eq!(cents_off_from_pitch(452.9, 70), -50);
    }

    #[test]
    fn test_negative_note_names() {
        assert_eq!(note_name(-1), "B");
        assert_eq!(note_name(-12), "C");
        assert_eq!(note_name(-3), "A");
        assert_eq!(octave(-1), -2);
        assert_eq!(octave(0), -1);
        assert_eq!(octave(11), -1);
        assert_eq!(octave(12), 0);
    }

    #[test]
    fn test_note_names_cycle() {
        for note in -36..=127 {
            assert_eq!(note_name(note), note_name(note + 12));
            assert_eq!(note_name(note), NOTE_NAMES[note.rem_euclid(12) as usize]);
        }
    }

    #[test]
    fn test_tuning_status() {
        assert_eq!(TuningStatus::from_cents(0), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(9), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(-9), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(10), TuningStatus::Sharp);
        assert_eq!(TuningStatus::from_cents(-10), TuningStatus::Flat);
        assert_eq!(TuningStatus::from_cents(-50), TuningStatus::Flat);
        assert_eq!(TuningStatus::Flat.label(), "FLAT");
        assert_eq!(TuningStatus::InTune.to_string(), "IN TUNE");
    }
}
