// pitchtrack-core/src/lib.rs

//! The core logic for the pitch tracker.
//! This crate is responsible for pitch estimation, note mapping, and running
//! a capture session that feeds audio frames through both. It is completely
//! headless and contains no display code.

pub mod analysis;
pub mod audio;
pub mod error;
pub mod pitch;
pub mod session;
pub mod tuning;
pub mod wav;

pub use analysis::{NoteReading, Reading, analyze_frame, analyze_signal};
pub use error::EstimateError;
pub use pitch::{PitchEstimate, estimate};
pub use session::{FrameSource, Session};
pub use tuning::{Note, TuningStatus, cents_off_from_pitch, frequency_from_note, note_from_frequency};
