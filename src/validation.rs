//! Calibration validation engine
//!
//! Collects gaze samples per on-screen target point and computes angular
//! accuracy and precision statistics against the known target positions.
//!
//! This is the one concurrent subsystem of the crate: device records arrive
//! on the producer thread behind [`GazeSource::subscribe`], while a per-point
//! timeout fires from a timer thread. One mutex guards the buffer append,
//! the sample-count check, the timeout cancellation, and the collecting-flag
//! transition, so exactly one completion path runs for a given point.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::device::{GazeListener, GazeSource, TrackerEyeSample, TrackerGazeSample};
use crate::error::GazeError;
use crate::geometry::{mean_point, Point2, Point3, Vector3};

pub const SAMPLE_COUNT_MIN: usize = 10;
pub const SAMPLE_COUNT_MAX: usize = 3000;
pub const TIMEOUT_MS_MIN: u64 = 100;
pub const TIMEOUT_MS_MAX: u64 = 3000;

pub const DEFAULT_SAMPLE_COUNT: usize = 30;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Per-target-point validation outcome.
///
/// Statistics are NaN and `timed_out` is set when fewer than the configured
/// sample count was gathered for the point; the partial raw samples are kept
/// either way. Immutable once created by [`ScreenBasedValidation::compute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPoint {
    pub screen_point: Point2,
    pub accuracy_left: f64,
    pub accuracy_right: f64,
    pub precision_left: f64,
    pub precision_right: f64,
    pub precision_rms_left: f64,
    pub precision_rms_right: f64,
    pub timed_out: bool,
    pub samples: Vec<TrackerGazeSample>,
}

/// Result of a validation run: per-point outcomes plus six statistics
/// averaged over the points with sufficient data. All averages are NaN when
/// no point qualified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub points: Vec<ValidationPoint>,
    pub average_accuracy_left: f64,
    pub average_accuracy_right: f64,
    pub average_precision_left: f64,
    pub average_precision_right: f64,
    pub average_precision_rms_left: f64,
    pub average_precision_rms_right: f64,
}

impl ValidationResult {
    /// Formatted textual report for display by the experiment UI.
    pub fn summary(&self) -> String {
        let mut out = String::from("Calibration validation result\n");
        for p in &self.points {
            if p.timed_out {
                out.push_str(&format!(
                    "  point ({:.2}, {:.2}): insufficient data ({} samples)\n",
                    p.screen_point.x,
                    p.screen_point.y,
                    p.samples.len()
                ));
            } else {
                out.push_str(&format!(
                    "  point ({:.2}, {:.2}): accuracy {:.2}/{:.2} deg, \
                     precision {:.2}/{:.2} deg, RMS {:.2}/{:.2} deg\n",
                    p.screen_point.x,
                    p.screen_point.y,
                    p.accuracy_left,
                    p.accuracy_right,
                    p.precision_left,
                    p.precision_right,
                    p.precision_rms_left,
                    p.precision_rms_right
                ));
            }
        }
        out.push_str(&format!(
            "  average accuracy {:.2}/{:.2} deg, precision {:.2}/{:.2} deg, \
             RMS {:.2}/{:.2} deg (left/right)\n",
            self.average_accuracy_left,
            self.average_accuracy_right,
            self.average_precision_left,
            self.average_precision_right,
            self.average_precision_rms_left,
            self.average_precision_rms_right
        ));
        out
    }

    pub fn to_json(&self) -> Result<String, GazeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct CollectedPoint {
    point: Point2,
    samples: Vec<TrackerGazeSample>,
}

struct Shared {
    validation_mode: bool,
    collecting: bool,
    /// Bumped per collection; a late timer firing for a superseded
    /// collection must not touch the current one.
    generation: u64,
    current_point: Option<Point2>,
    current_samples: Vec<TrackerGazeSample>,
    cancel_tx: Option<mpsc::Sender<()>>,
    collected: Vec<CollectedPoint>,
}

impl Shared {
    fn new() -> Self {
        Self {
            validation_mode: false,
            collecting: false,
            generation: 0,
            current_point: None,
            current_samples: Vec::new(),
            cancel_tx: None,
            collected: Vec::new(),
        }
    }

    /// Move the current buffer into the accumulated per-point data and end
    /// the collection. Must run under the engine lock; callers on both
    /// completion paths check `collecting` first, which makes completion
    /// exactly-once.
    fn commit_current(&mut self) {
        if let Some(point) = self.current_point.take() {
            let samples = std::mem::take(&mut self.current_samples);
            match self.collected.iter_mut().find(|c| c.point == point) {
                Some(entry) => entry.samples.extend(samples),
                None => self.collected.push(CollectedPoint { point, samples }),
            }
        }
        self.cancel_tx = None;
        self.collecting = false;
    }
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A poisoned lock only means a panicking test thread; the state itself
    // is still coherent for our single-field transitions.
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Stateful calibration validation for screen-based eye trackers.
///
/// Protocol: `enter_validation_mode` → per target point
/// `start_collecting_data` (completion by sample count or timeout) →
/// `compute` → `leave_validation_mode`.
pub struct ScreenBasedValidation {
    source: Arc<dyn GazeSource>,
    sample_count: usize,
    timeout: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl ScreenBasedValidation {
    pub fn new(
        source: Arc<dyn GazeSource>,
        sample_count: usize,
        timeout_ms: u64,
    ) -> Result<Self, GazeError> {
        if !(SAMPLE_COUNT_MIN..=SAMPLE_COUNT_MAX).contains(&sample_count) {
            return Err(GazeError::InvalidConfig(format!(
                "sample count must be between {} and {}",
                SAMPLE_COUNT_MIN, SAMPLE_COUNT_MAX
            )));
        }
        if !(TIMEOUT_MS_MIN..=TIMEOUT_MS_MAX).contains(&timeout_ms) {
            return Err(GazeError::InvalidConfig(format!(
                "timeout must be between {} and {} ms",
                TIMEOUT_MS_MIN, TIMEOUT_MS_MAX
            )));
        }
        Ok(Self {
            source,
            sample_count,
            timeout: Duration::from_millis(timeout_ms),
            shared: Arc::new(Mutex::new(Shared::new())),
        })
    }

    pub fn with_defaults(source: Arc<dyn GazeSource>) -> Result<Self, GazeError> {
        Self::new(source, DEFAULT_SAMPLE_COUNT, DEFAULT_TIMEOUT_MS)
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn is_validation_mode(&self) -> bool {
        lock_shared(&self.shared).validation_mode
    }

    pub fn is_collecting_data(&self) -> bool {
        lock_shared(&self.shared).collecting
    }

    /// Enter validation mode: clears previously collected points and starts
    /// the gaze subscription.
    pub fn enter_validation_mode(&self) -> Result<(), GazeError> {
        {
            let mut shared = lock_shared(&self.shared);
            if shared.validation_mode || shared.collecting {
                return Err(GazeError::InvalidState(
                    "validation mode already entered".to_string(),
                ));
            }
            shared.collected.clear();
            shared.validation_mode = true;
        }

        let shared = Arc::clone(&self.shared);
        let sample_count = self.sample_count;
        let listener: GazeListener = Box::new(move |sample| {
            let mut guard = lock_shared(&shared);
            if !guard.collecting {
                return;
            }
            // Validation requires usable gaze-point data from both eyes
            if sample.left.gaze_point_valid && sample.right.gaze_point_valid {
                guard.current_samples.push(*sample);
                if guard.current_samples.len() >= sample_count {
                    if let Some(tx) = guard.cancel_tx.take() {
                        let _ = tx.send(());
                    }
                    guard.commit_current();
                }
            }
        });
        if let Err(err) = self.source.subscribe(listener) {
            lock_shared(&self.shared).validation_mode = false;
            return Err(err);
        }
        Ok(())
    }

    /// Leave validation mode and stop the gaze subscription. Collected data
    /// is kept until the next `enter_validation_mode` or `clear`.
    pub fn leave_validation_mode(&self) -> Result<(), GazeError> {
        {
            let mut shared = lock_shared(&self.shared);
            if !shared.validation_mode {
                return Err(GazeError::InvalidState(
                    "not in validation mode".to_string(),
                ));
            }
            if shared.collecting {
                return Err(GazeError::InvalidState(
                    "cannot leave validation mode while collecting data".to_string(),
                ));
            }
            shared.validation_mode = false;
            shared.current_point = None;
            shared.current_samples.clear();
        }
        self.source.unsubscribe();
        Ok(())
    }

    /// Begin collecting samples for one target point in the normalized
    /// active display coordinate system. Completion is signalled by the
    /// collecting flag dropping, either on reaching the sample count or on
    /// timeout.
    pub fn start_collecting_data(&self, screen_point: Point2) -> Result<(), GazeError> {
        if !screen_point.in_unit_square() {
            return Err(GazeError::PointOutOfBounds(screen_point.x, screen_point.y));
        }

        let (tx, rx) = mpsc::channel();
        let generation;
        {
            let mut shared = lock_shared(&self.shared);
            if !shared.validation_mode {
                return Err(GazeError::InvalidState(
                    "not in validation mode".to_string(),
                ));
            }
            if shared.collecting {
                return Err(GazeError::InvalidState(
                    "already collecting data".to_string(),
                ));
            }
            shared.generation += 1;
            generation = shared.generation;
            shared.current_point = Some(screen_point);
            shared.current_samples.clear();
            shared.cancel_tx = Some(tx);
            shared.collecting = true;
        }

        let shared = Arc::clone(&self.shared);
        let timeout = self.timeout;
        thread::spawn(move || {
            // The count-based completion path sends on the channel, waking
            // this thread early; a plain timeout is the timeout path.
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
                let mut guard = lock_shared(&shared);
                if guard.collecting && guard.generation == generation {
                    // Partial data is kept but will fail the sample-count
                    // check in compute()
                    guard.commit_current();
                }
            }
        });
        Ok(())
    }

    /// Drop the accumulated data for one target point.
    pub fn discard_data(&self, screen_point: Point2) -> Result<(), GazeError> {
        let mut shared = lock_shared(&self.shared);
        if !shared.validation_mode {
            return Err(GazeError::InvalidState(
                "not in validation mode, no points to discard".to_string(),
            ));
        }
        if shared.collecting {
            return Err(GazeError::InvalidState(
                "cannot discard data while collecting".to_string(),
            ));
        }
        match shared.collected.iter().position(|c| c.point == screen_point) {
            Some(idx) => {
                shared.collected.remove(idx);
                Ok(())
            }
            None => Err(GazeError::InvalidState(format!(
                "no data collected for point ({}, {})",
                screen_point.x, screen_point.y
            ))),
        }
    }

    /// Drop all accumulated data.
    pub fn clear(&self) -> Result<(), GazeError> {
        let mut shared = lock_shared(&self.shared);
        if shared.collecting {
            return Err(GazeError::InvalidState(
                "cannot clear data while collecting".to_string(),
            ));
        }
        shared.current_point = None;
        shared.current_samples.clear();
        shared.collected.clear();
        Ok(())
    }

    /// Compute accuracy and precision statistics from the accumulated data.
    ///
    /// Points with fewer than the configured sample count carry NaN
    /// statistics and `timed_out`, and are excluded from the averages;
    /// insufficient data is not an error.
    pub fn compute(&self) -> Result<ValidationResult, GazeError> {
        let display_area = self.source.display_area();
        let shared = lock_shared(&self.shared);
        if shared.collecting {
            return Err(GazeError::InvalidState(
                "still collecting data".to_string(),
            ));
        }

        let mut points = Vec::with_capacity(shared.collected.len());
        let mut sums = [0.0f64; 6];
        let mut qualified = 0usize;

        for entry in &shared.collected {
            if entry.samples.len() < self.sample_count {
                points.push(ValidationPoint {
                    screen_point: entry.point,
                    accuracy_left: f64::NAN,
                    accuracy_right: f64::NAN,
                    precision_left: f64::NAN,
                    precision_right: f64::NAN,
                    precision_rms_left: f64::NAN,
                    precision_rms_right: f64::NAN,
                    timed_out: true,
                    samples: entry.samples.clone(),
                });
                continue;
            }

            let stimuli = display_area.point_on_display(entry.point);
            let (accuracy_left, precision_left, precision_rms_left) =
                eye_statistics(&entry.samples, |s| &s.left, stimuli);
            let (accuracy_right, precision_right, precision_rms_right) =
                eye_statistics(&entry.samples, |s| &s.right, stimuli);

            sums[0] += accuracy_left;
            sums[1] += accuracy_right;
            sums[2] += precision_left;
            sums[3] += precision_right;
            sums[4] += precision_rms_left;
            sums[5] += precision_rms_right;
            qualified += 1;

            points.push(ValidationPoint {
                screen_point: entry.point,
                accuracy_left,
                accuracy_right,
                precision_left,
                precision_right,
                precision_rms_left,
                precision_rms_right,
                timed_out: false,
                samples: entry.samples.clone(),
            });
        }

        let average = |sum: f64| {
            if qualified > 0 {
                sum / qualified as f64
            } else {
                f64::NAN
            }
        };

        Ok(ValidationResult {
            points,
            average_accuracy_left: average(sums[0]),
            average_accuracy_right: average(sums[1]),
            average_precision_left: average(sums[2]),
            average_precision_right: average(sums[3]),
            average_precision_rms_left: average(sums[4]),
            average_precision_rms_right: average(sums[5]),
        })
    }
}

/// Accuracy, precision, and RMS precision for one eye over a point's samples.
fn eye_statistics(
    samples: &[TrackerGazeSample],
    eye: fn(&TrackerGazeSample) -> &TrackerEyeSample,
    stimuli: Point3,
) -> (f64, f64, f64) {
    let origins: Vec<Point3> = samples.iter().map(|s| eye(s).gaze_origin).collect();
    let gaze_points: Vec<Point3> = samples.iter().map(|s| eye(s).gaze_point).collect();

    let origin_mean = mean_point(&origins);
    let gaze_point_mean = mean_point(&gaze_points);

    let directions: Vec<Vector3> = origins
        .iter()
        .zip(&gaze_points)
        .map(|(o, p)| Vector3::between(*o, *p).normalize())
        .collect();
    let directions_to_mean: Vec<Vector3> = origins
        .iter()
        .map(|o| Vector3::between(*o, gaze_point_mean).normalize())
        .collect();

    // Accuracy: angle between where the eye was told to look and where it
    // looked on average
    let direction_target = Vector3::between(origin_mean, stimuli).normalize();
    let direction_gaze = Vector3::between(origin_mean, gaze_point_mean).normalize();
    let accuracy = direction_target.angle(&direction_gaze);

    // Precision: RMS of each sample's angular deviation from its own
    // direction-to-the-mean-gaze-point
    let precision = rms(directions
        .iter()
        .zip(&directions_to_mean)
        .map(|(d, m)| d.angle(m)));

    // RMS precision: sample-to-sample angular jitter
    let precision_rms = rms(directions.windows(2).map(|pair| pair[0].angle(&pair[1])));

    (accuracy, precision, precision_rms)
}

fn rms(angles: impl Iterator<Item = f64>) -> f64 {
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for a in angles {
        sum_sq += a * a;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        (sum_sq / count as f64).sqrt()
    }
}
