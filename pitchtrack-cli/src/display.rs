//! Turns readings into output lines, either human-readable text or JSON.

use anyhow::Result;
use pitchtrack_core::{Reading, TuningStatus};
use serde::Serialize;
use std::collections::VecDeque;

/// Number of readings averaged for the displayed cents value.
pub const DEFAULT_SMOOTHING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Moving average over the most recent cent deviations.
///
/// A reading without a pitch clears the history, so a new note never
/// inherits the previous note's deviation.
#[derive(Debug)]
pub struct CentSmoother {
    window: usize,
    values: VecDeque<i32>,
}

impl CentSmoother {
    /// A window of 0 or 1 passes values through unchanged.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    /// Adds a value and returns the current average, or clears on `None`.
    pub fn push(&mut self, cents: Option<i32>) -> Option<f32> {
        let Some(cents) = cents else {
            self.values.clear();
            return None;
        };
        self.values.push_back(cents);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
        Some(self.values.iter().sum::<i32>() as f32 / self.values.len() as f32)
    }
}

#[derive(Serialize)]
struct TimedReading<'a> {
    time: f64,
    #[serde(flatten)]
    reading: &'a Reading,
}

/// Formats readings for one output stream.
#[derive(Debug)]
pub struct Printer {
    format: OutputFormat,
    smoother: CentSmoother,
}

impl Printer {
    pub fn new(format: OutputFormat, smoothing: usize) -> Self {
        Self {
            format,
            smoother: CentSmoother::new(smoothing),
        }
    }

    /// Formats a live reading.
    pub fn line(&mut self, reading: &Reading) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(reading)?),
            OutputFormat::Text => Ok(self.text(reading)),
        }
    }

    /// Formats a reading taken `time` seconds into a recording.
    pub fn timed_line(&mut self, time: f64, reading: &Reading) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(&TimedReading { time, reading })?),
            OutputFormat::Text => Ok(format!("{:>8.3}s  {}", time, self.text(reading))),
        }
    }

    fn text(&mut self, reading: &Reading) -> String {
        let cents = self.smoother.push(reading.note.as_ref().map(|note| note.cents));
        match (reading.frequency, &reading.note, cents) {
            (Some(freq), Some(note), Some(cents)) => {
                let cents = cents.round() as i32;
                let label = format!("{}{}", note.name, note.octave);
                format!(
                    "{:<4} {:>7.1} Hz {:>+4} cents  {}",
                    label,
                    freq,
                    cents,
                    TuningStatus::from_cents(cents)
                )
            }
            _ => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchtrack_core::PitchEstimate;

    #[test]
    fn test_smoother_averages_and_clears() {
        let mut smoother = CentSmoother::new(3);
        assert_eq!(smoother.push(Some(3)), Some(3.0));
        assert_eq!(smoother.push(Some(6)), Some(4.5));
        assert_eq!(smoother.push(Some(9)), Some(6.0));
        assert_eq!(smoother.push(Some(12)), Some(9.0));
        assert_eq!(smoother.push(None), None);
        assert_eq!(smoother.push(Some(-4)), Some(-4.0));
    }

    #[test]
    fn test_smoothing_disabled() {
        let mut smoother = CentSmoother::new(0);
        assert_eq!(smoother.push(Some(7)), Some(7.0));
        assert_eq!(smoother.push(Some(-7)), Some(-7.0));
    }

    #[test]
    fn test_text_lines() {
        let mut printer = Printer::new(OutputFormat::Text, 1);
        assert_eq!(printer.line(&Reading::default()).unwrap(), "-");

        let line = printer
            .line(&Reading::from_estimate(PitchEstimate::Pitch(440.0)))
            .unwrap();
        assert_eq!(line, "A4     440.0 Hz   +0 cents  IN TUNE");

        let line = printer
            .line(&Reading::from_estimate(PitchEstimate::Pitch(435.0)))
            .unwrap();
        assert!(line.starts_with("A4"));
        assert!(line.contains("-20 cents"));
        assert!(line.ends_with("FLAT"));
    }

    #[test]
    fn test_text_uses_smoothed_cents() {
        let mut printer = Printer::new(OutputFormat::Text, 2);
        printer
            .line(&Reading::from_estimate(PitchEstimate::Pitch(445.0)))
            .unwrap();
        // (19 + 0) / 2 rounds to 10, which is just sharp.
        let line = printer
            .line(&Reading::from_estimate(PitchEstimate::Pitch(440.0)))
            .unwrap();
        assert!(line.contains("+10 cents"), "{}", line);
        assert!(line.ends_with("SHARP"));
    }

    #[test]
    fn test_json_lines() {
        let mut printer = Printer::new(OutputFormat::Json, DEFAULT_SMOOTHING);
        let line = printer
            .line(&Reading::from_estimate(PitchEstimate::Pitch(445.0)))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["note"]["cents"], 19);
        assert_eq!(value["note"]["status"], "sharp");

        let line = printer.timed_line(0.5, &Reading::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["time"], 0.5);
        assert!(value["frequency"].is_null());
    }

    #[test]
    fn test_timed_text_line() {
        let mut printer = Printer::new(OutputFormat::Text, 1);
        assert_eq!(printer.timed_line(1.25, &Reading::default()).unwrap(), "   1.250s  -");
    }
}
