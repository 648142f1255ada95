//! Gazeflow - Gaze data processing and calibration validation for screen-based eye trackers
//!
//! Gazeflow turns raw eye-tracker output into analysis-ready gaze traces:
//! device samples are converted into screen coordinates, recorded to a
//! tab-separated session format, loaded back, smoothed, and segmented into
//! fixations. A separate validation engine measures how accurate a tracker
//! calibration actually is.
//!
//! ## Modules
//!
//! - **Recording**: capture device samples and experiment events into sessions
//!   and write/read the tab-separated data format
//! - **Analysis**: interpolation, moving-average smoothing, and velocity- or
//!   dispersion-based fixation detection
//! - **Validation**: per-target-point accuracy and precision statistics in
//!   degrees of visual angle

pub mod datafile;
pub mod device;
pub mod error;
pub mod filter;
pub mod fixation;
pub mod geometry;
pub mod interpolate;
pub mod recorder;
pub mod screen;
pub mod types;
pub mod validation;

pub use error::GazeError;
pub use geometry::{DisplayArea, Point2, Point3, Vector3};
pub use screen::{ScreenConfig, ScreenUnits};
pub use types::{
    ConvertedRecord, EventMode, Eye, Fixation, GazeEvent, GazeRecord, SessionData, SessionEvent,
};

// Recording exports
pub use datafile::{load_sessions, load_sessions_from_path};
pub use recorder::{DataFileWriter, GazeRecorder};

// Analysis exports
pub use filter::moving_average;
pub use fixation::{DispersionThreshold, VelocityThreshold};

// Validation exports
pub use device::{GazeListener, GazeSource, TrackerEyeSample, TrackerGazeSample};
pub use validation::{ScreenBasedValidation, ValidationPoint, ValidationResult};

/// Crate version reported by the command line tool
pub const GAZEFLOW_VERSION: &str = env!("CARGO_PKG_VERSION");
