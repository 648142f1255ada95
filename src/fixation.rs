//! Fixation detection
//!
//! Two interchangeable algorithms segment a converted gaze trace into
//! fixations: velocity-threshold (I-VT) and dispersion-threshold (I-DT).
//! Both are parameterized by an eye selector and a minimum duration, and
//! both return mean positions computed over the half-open index range
//! `[start, end)` of the accepted run.

use serde::{Deserialize, Serialize};

use crate::types::{ConvertedRecord, Eye, Fixation};

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn build_fixation(
    samples: &[ConvertedRecord],
    xs: &[f64],
    ys: &[f64],
    start: usize,
    end: usize,
) -> Fixation {
    Fixation {
        onset: samples[start].time_ms,
        duration: samples[end].time_ms - samples[start].time_ms,
        x: nan_mean(xs[start..end].iter().copied()),
        y: nan_mean(ys[start..end].iter().copied()),
    }
}

fn select_channels(samples: &[ConvertedRecord], eye: Eye) -> (Vec<f64>, Vec<f64>) {
    samples.iter().map(|s| s.position(eye)).unzip()
}

/// Velocity-threshold fixation detection (I-VT)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocityThreshold {
    /// Maximum inter-sample displacement that still counts as fixating,
    /// in screen units per sample
    pub max_velocity: f64,
    /// Minimum fixation duration in milliseconds
    pub min_duration: f64,
}

impl Default for VelocityThreshold {
    fn default() -> Self {
        Self {
            max_velocity: 100.0,
            min_duration: 100.0,
        }
    }
}

impl VelocityThreshold {
    /// Segment a trace into fixations.
    ///
    /// A run of consecutive sample pairs whose Euclidean displacement stays
    /// below `max_velocity` is a candidate; it is accepted once its duration
    /// reaches `min_duration`. A run still open at the end of the trace is
    /// closed there. NaN displacements terminate a run.
    pub fn detect(&self, samples: &[ConvertedRecord], eye: Eye) -> Vec<Fixation> {
        let (xs, ys) = select_channels(samples, eye);
        let mut fixations = Vec::new();
        if samples.len() < 2 {
            return fixations;
        }

        let mut run_start: Option<usize> = None;
        for idx in 0..samples.len() - 1 {
            let displacement =
                ((xs[idx + 1] - xs[idx]).powi(2) + (ys[idx + 1] - ys[idx]).powi(2)).sqrt();
            if displacement < self.max_velocity {
                run_start.get_or_insert(idx);
            } else if let Some(start) = run_start.take() {
                if samples[idx].time_ms - samples[start].time_ms >= self.min_duration {
                    fixations.push(build_fixation(samples, &xs, &ys, start, idx));
                }
            }
        }
        if let Some(start) = run_start {
            let end = samples.len() - 1;
            if samples[end].time_ms - samples[start].time_ms >= self.min_duration {
                fixations.push(build_fixation(samples, &xs, &ys, start, end));
            }
        }
        fixations
    }
}

/// Dispersion-threshold fixation detection (I-DT)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispersionThreshold {
    /// Bounding-box side at which the candidate window closes, in screen units
    pub max_dispersion: f64,
    /// Minimum fixation duration in milliseconds
    pub min_duration: f64,
}

impl Default for DispersionThreshold {
    fn default() -> Self {
        Self {
            max_dispersion: 50.0,
            min_duration: 100.0,
        }
    }
}

impl DispersionThreshold {
    /// Segment a trace into fixations.
    ///
    /// The candidate window grows sample-by-sample, skipping leading NaNs;
    /// it closes once the larger of its x- and y-ranges reaches
    /// `max_dispersion`, with the window's duration measured to the sample
    /// before the closing one. The closing sample starts the next window but
    /// its coordinates are not re-seeded into it.
    pub fn detect(&self, samples: &[ConvertedRecord], eye: Eye) -> Vec<Fixation> {
        let (xs, ys) = select_channels(samples, eye);
        let mut fixations = Vec::new();

        let mut window: Vec<(f64, f64)> = Vec::new();
        let mut start = 0usize;

        for idx in 0..samples.len() {
            if xs[idx].is_nan() {
                if idx == start {
                    start += 1;
                    continue;
                }
            } else {
                window.push((xs[idx], ys[idx]));
            }

            if window.is_empty() {
                continue;
            }
            let mut x_min = f64::INFINITY;
            let mut x_max = f64::NEG_INFINITY;
            let mut y_min = f64::INFINITY;
            let mut y_max = f64::NEG_INFINITY;
            for &(x, y) in &window {
                x_min = x_min.min(x);
                x_max = x_max.max(x);
                if !y.is_nan() {
                    y_min = y_min.min(y);
                    y_max = y_max.max(y);
                }
            }
            let dispersion = (x_max - x_min).max(y_max - y_min);
            if dispersion >= self.max_dispersion && idx > 0 {
                let end = idx - 1;
                if samples[end].time_ms - samples[start].time_ms >= self.min_duration {
                    fixations.push(build_fixation(samples, &xs, &ys, start, end));
                }
                window.clear();
                start = idx;
            }
        }

        fixations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t_ms: f64, x: f64, y: f64) -> ConvertedRecord {
        ConvertedRecord {
            time_ms: t_ms,
            left_x: x,
            left_y: y,
            left_pupil: 3.0,
            left_valid: 1,
            right_x: x,
            right_y: y,
            right_pupil: 3.0,
            right_valid: 1,
            avg_x: x,
            avg_y: y,
        }
    }

    /// Steady samples at (x, y), 10 ms apart, followed by a fast jump away
    fn steady_then_jump(count: usize) -> Vec<ConvertedRecord> {
        let mut trace: Vec<_> = (0..count)
            .map(|i| sample(10.0 * i as f64, 100.0, 100.0))
            .collect();
        trace.push(sample(10.0 * count as f64, 900.0, 900.0));
        trace
    }

    #[test]
    fn test_vt_min_duration_boundary() {
        let vt = VelocityThreshold {
            max_velocity: 10.0,
            min_duration: 100.0,
        };
        // Run spans 90 ms: rejected
        let fixations = vt.detect(&steady_then_jump(10), Eye::Average);
        assert!(fixations.is_empty());

        // Extending past min_duration yields exactly one
        let fixations = vt.detect(&steady_then_jump(12), Eye::Average);
        assert_eq!(fixations.len(), 1);
        assert_eq!(fixations[0].onset, 0.0);
        assert_eq!(fixations[0].duration, 110.0);
        assert_eq!(fixations[0].x, 100.0);
        assert_eq!(fixations[0].y, 100.0);
    }

    #[test]
    fn test_vt_trailing_run_is_closed_at_trace_end() {
        let trace: Vec<_> = (0..20)
            .map(|i| sample(10.0 * i as f64, 100.0, 100.0))
            .collect();
        let vt = VelocityThreshold {
            max_velocity: 10.0,
            min_duration: 100.0,
        };
        let fixations = vt.detect(&trace, Eye::Average);
        assert_eq!(fixations.len(), 1);
        assert_eq!(fixations[0].duration, 190.0);
    }

    #[test]
    fn test_vt_empty_and_short_traces() {
        let vt = VelocityThreshold::default();
        assert!(vt.detect(&[], Eye::Average).is_empty());
        assert!(vt.detect(&[sample(0.0, 1.0, 1.0)], Eye::Average).is_empty());
    }

    #[test]
    fn test_vt_nan_terminates_run() {
        let mut trace: Vec<_> = (0..25)
            .map(|i| sample(10.0 * i as f64, 100.0, 100.0))
            .collect();
        trace[12] = sample(120.0, f64::NAN, f64::NAN);
        let vt = VelocityThreshold {
            max_velocity: 10.0,
            min_duration: 100.0,
        };
        let fixations = vt.detect(&trace, Eye::Average);
        // Split into two runs around the dropout; both long enough
        assert_eq!(fixations.len(), 2);
    }

    #[test]
    fn test_vt_eye_selection() {
        let mut trace: Vec<_> = (0..15)
            .map(|i| sample(10.0 * i as f64, 100.0, 100.0))
            .collect();
        // Left eye saccades while the right stays steady
        for (i, s) in trace.iter_mut().enumerate() {
            s.left_x = 100.0 * i as f64;
        }
        trace.push(sample(150.0, 900.0, 900.0));
        let vt = VelocityThreshold {
            max_velocity: 10.0,
            min_duration: 100.0,
        };
        assert!(vt.detect(&trace, Eye::Left).is_empty());
        assert_eq!(vt.detect(&trace, Eye::Right).len(), 1);
    }

    #[test]
    fn test_dt_detects_two_clusters() {
        let mut trace = Vec::new();
        for i in 0..15 {
            trace.push(sample(10.0 * i as f64, 100.0 + (i % 2) as f64, 100.0));
        }
        for i in 15..30 {
            trace.push(sample(10.0 * i as f64, 500.0 + (i % 2) as f64, 500.0));
        }
        // A final far-away sample closes the second cluster's window
        trace.push(sample(300.0, 1500.0, 1500.0));
        let dt = DispersionThreshold {
            max_dispersion: 50.0,
            min_duration: 100.0,
        };
        let fixations = dt.detect(&trace, Eye::Average);
        assert_eq!(fixations.len(), 2);
        assert!((fixations[0].x - 100.5).abs() < 1.0);
        assert!((fixations[1].x - 500.5).abs() < 1.0);
    }

    #[test]
    fn test_dt_short_cluster_rejected() {
        let mut trace = Vec::new();
        for i in 0..5 {
            trace.push(sample(10.0 * i as f64, 100.0, 100.0));
        }
        trace.push(sample(50.0, 900.0, 900.0));
        let dt = DispersionThreshold {
            max_dispersion: 50.0,
            min_duration: 100.0,
        };
        assert!(dt.detect(&trace, Eye::Average).is_empty());
    }

    #[test]
    fn test_dt_skips_leading_nans() {
        let mut trace = vec![
            sample(0.0, f64::NAN, f64::NAN),
            sample(10.0, f64::NAN, f64::NAN),
        ];
        for i in 2..20 {
            trace.push(sample(10.0 * i as f64, 100.0, 100.0));
        }
        trace.push(sample(200.0, 900.0, 900.0));
        let dt = DispersionThreshold {
            max_dispersion: 50.0,
            min_duration: 100.0,
        };
        let fixations = dt.detect(&trace, Eye::Average);
        assert_eq!(fixations.len(), 1);
        assert_eq!(fixations[0].onset, 20.0);
    }

    // Known edge case: when a window closes at sample idx, the next window
    // starts timing from idx but idx's coordinates never enter its dispersion
    // computation, so closure decisions ignore the new window's first sample.
    // Kept for output compatibility with existing analyses.
    #[test]
    fn test_dt_window_restart_drops_boundary_sample() {
        let mut trace = Vec::new();
        for i in 0..15 {
            trace.push(sample(10.0 * i as f64, 100.0, 100.0));
        }
        // Jump sample closes the first window and becomes the next start
        for i in 15..30 {
            trace.push(sample(10.0 * i as f64, 500.0, 500.0));
        }
        trace.push(sample(300.0, 1500.0, 1500.0));
        let dt = DispersionThreshold {
            max_dispersion: 50.0,
            min_duration: 100.0,
        };
        let fixations = dt.detect(&trace, Eye::Average);
        assert_eq!(fixations.len(), 2);
        // Second fixation's onset is the closing sample of the first window
        assert_eq!(fixations[1].onset, 150.0);
        // Sample 15 counts toward onset and mean, but its coordinates were
        // never part of the second window's dispersion bookkeeping
        assert_eq!(fixations[1].x, 500.0);
    }

    #[test]
    fn test_dt_empty_trace() {
        let dt = DispersionThreshold::default();
        assert!(dt.detect(&[], Eye::Average).is_empty());
    }
}
