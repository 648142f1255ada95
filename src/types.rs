//! Core types for the gaze pipeline
//!
//! Raw device records, recorded experiment events, converted on-screen
//! records, parsed sessions, and fixations. NaN is the pervasive
//! missing-data sentinel; a validity flag accompanies every gaze channel.

use serde::{Deserialize, Serialize};

/// A raw binocular gaze sample as reported by the tracking device.
///
/// Positions are in the normalized active display coordinate system, pupil
/// diameters in millimeters, timestamps in microseconds of the device clock.
/// Immutable once created; owned by the recorder for the session duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeRecord {
    pub timestamp: i64,
    pub left_x: f64,
    pub left_y: f64,
    pub left_pupil: f64,
    pub left_valid: u8,
    pub right_x: f64,
    pub right_y: f64,
    pub right_pupil: f64,
    pub right_valid: u8,
}

/// A timestamped experiment event recorded during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeEvent {
    /// Device clock timestamp, microseconds
    pub timestamp: i64,
    pub text: String,
}

/// An event as it appears in a parsed data file: session-relative time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Milliseconds since session start
    pub time_ms: f64,
    pub text: String,
}

/// How events are written to the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMode {
    /// Events appended as a separate two-column block after the gaze rows
    Separated,
    /// Events carried in a 12th column, time-ordered between gaze rows
    Embedded,
}

impl EventMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventMode::Separated => "Separated",
            EventMode::Embedded => "Embedded",
        }
    }
}

/// Eye selector for analysis operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Left,
    Right,
    /// The averaged-gaze channel
    Average,
}

/// A gaze sample converted to the application's screen units.
///
/// This is the 11-column row of the data file: elapsed time in milliseconds
/// relative to session start, per-eye position/pupil/validity, and the
/// averaged gaze position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRecord {
    pub time_ms: f64,
    pub left_x: f64,
    pub left_y: f64,
    pub left_pupil: f64,
    pub left_valid: u8,
    pub right_x: f64,
    pub right_y: f64,
    pub right_pupil: f64,
    pub right_valid: u8,
    pub avg_x: f64,
    pub avg_y: f64,
}

impl ConvertedRecord {
    /// Position of the selected gaze channel
    pub fn position(&self, eye: Eye) -> (f64, f64) {
        match eye {
            Eye::Left => (self.left_x, self.left_y),
            Eye::Right => (self.right_x, self.right_y),
            Eye::Average => (self.avg_x, self.avg_y),
        }
    }
}

/// Averaged gaze position from two eyes' positions and validity flags.
///
/// Both eyes invalid yields (NaN, NaN); exactly one valid eye yields that
/// eye's position; both valid yields the elementwise mean.
pub fn average_gaze(
    left: (f64, f64),
    left_valid: u8,
    right: (f64, f64),
    right_valid: u8,
) -> (f64, f64) {
    match (left_valid, right_valid) {
        (0, 0) => (f64::NAN, f64::NAN),
        (0, _) => right,
        (_, 0) => left,
        _ => ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0),
    }
}

/// One recording session parsed back from a data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub samples: Vec<ConvertedRecord>,
    pub events: Vec<SessionEvent>,
}

/// A detected fixation: onset and duration in milliseconds, mean position
/// in the screen units the trace was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fixation {
    pub onset: f64,
    pub duration: f64,
    pub x: f64,
    pub y: f64,
}
