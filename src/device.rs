//! Tracking-device collaborator contract
//!
//! The device glue (out of scope for this crate) implements [`GazeSource`]:
//! a push subscription delivering samples from the device's producer thread,
//! the physical display-area geometry, and the device clock. The validation
//! engine subscribes directly; recording feeds samples to [`GazeRecorder`]
//! via [`TrackerGazeSample::to_gaze_record`].
//!
//! [`GazeRecorder`]: crate::recorder::GazeRecorder

use serde::{Deserialize, Serialize};

use crate::error::GazeError;
use crate::geometry::{DisplayArea, Point2, Point3};
use crate::types::GazeRecord;

/// One eye's measurements within a device sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackerEyeSample {
    /// Gaze point in the normalized active display coordinate system
    pub display_point: Point2,
    /// Gaze point in the device's 3D user coordinate space
    pub gaze_point: Point3,
    /// Gaze origin (eye position) in the device's 3D user coordinate space
    pub gaze_origin: Point3,
    /// Pupil diameter in millimeters
    pub pupil_diameter: f64,
    pub gaze_point_valid: bool,
}

/// A binocular sample as delivered by the device's push subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackerGazeSample {
    /// Device clock timestamp, microseconds
    pub system_time_micros: i64,
    pub left: TrackerEyeSample,
    pub right: TrackerEyeSample,
}

impl TrackerGazeSample {
    /// Flatten to the recorder's raw record shape.
    pub fn to_gaze_record(&self) -> GazeRecord {
        GazeRecord {
            timestamp: self.system_time_micros,
            left_x: self.left.display_point.x,
            left_y: self.left.display_point.y,
            left_pupil: self.left.pupil_diameter,
            left_valid: self.left.gaze_point_valid as u8,
            right_x: self.right.display_point.x,
            right_y: self.right.display_point.y,
            right_pupil: self.right.pupil_diameter,
            right_valid: self.right.gaze_point_valid as u8,
        }
    }
}

/// Callback registered with a [`GazeSource`] subscription. Invoked on the
/// device's producer thread at its native sampling rate.
pub type GazeListener = Box<dyn Fn(&TrackerGazeSample) + Send + Sync>;

/// Contract the tracking-device glue provides to this crate
pub trait GazeSource: Send + Sync {
    /// Start delivering samples to `listener`. Fails with a state error if a
    /// subscription is already active.
    fn subscribe(&self, listener: GazeListener) -> Result<(), GazeError>;

    /// Stop delivering samples.
    fn unsubscribe(&self);

    /// Physical display-area geometry in the device's user coordinate space
    fn display_area(&self) -> DisplayArea;

    /// Current device clock timestamp, microseconds; same clock domain as
    /// the delivered samples
    fn system_time_micros(&self) -> i64;
}
