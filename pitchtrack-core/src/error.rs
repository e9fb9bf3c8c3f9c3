//! Error types for pitch estimation.

use thiserror::Error;

/// Caller contract violations detected by [`crate::pitch::estimate`].
///
/// Quiet or unpitched audio is not an error; it is reported as
/// [`crate::pitch::PitchEstimate::NoPitch`]. These variants point at a bug in
/// whatever filled the buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    /// The buffer contained no samples.
    #[error("audio buffer is empty")]
    EmptyBuffer,

    /// The sample rate was zero.
    #[error("sample rate must be positive")]
    InvalidSampleRate,

    /// A sample was NaN or infinite.
    #[error("non-finite sample at index {index}")]
    NonFiniteSample {
        /// Position of the first offending sample.
        index: usize,
    },
}
