//! Linear interpolation of gaze samples
//!
//! Used in two places: synthesizing a record at an event timestamp while
//! flushing an embedded-mode data file, and post-hoc lookup at an arbitrary
//! time within a parsed session's converted trace.

use crate::types::{average_gaze, ConvertedRecord, GazeRecord};

/// Interpolated per-eye channel triple plus validity
fn lerp_eye(
    p1: (f64, f64, f64),
    v1: u8,
    p2: (f64, f64, f64),
    v2: u8,
    w1: f64,
    w2: f64,
) -> (f64, f64, f64, u8) {
    match (v1, v2) {
        // Neither endpoint usable: carry the raw fields forward, invalid
        (0, 0) => (p1.0, p1.1, p1.2, 0),
        (0, _) => (p2.0, p2.1, p2.2, 1),
        (_, 0) => (p1.0, p1.1, p1.2, 1),
        _ => (
            w1 * p1.0 + w2 * p2.0,
            w1 * p1.1 + w2 * p2.1,
            w1 * p1.2 + w2 * p2.2,
            1,
        ),
    }
}

/// Synthesize a gaze record at timestamp `t` between two bracketing records.
///
/// Weights are `w1 = (t2-t)/(t2-t1)` and `w2 = (t-t1)/(t2-t1)`; they always
/// sum to one and the output timestamp is exactly `t`.
pub fn interpolate_record(r1: &GazeRecord, r2: &GazeRecord, t: i64) -> GazeRecord {
    let span = (r2.timestamp - r1.timestamp) as f64;
    let w1 = (r2.timestamp - t) as f64 / span;
    let w2 = (t - r1.timestamp) as f64 / span;

    let (lx, ly, lp, lv) = lerp_eye(
        (r1.left_x, r1.left_y, r1.left_pupil),
        r1.left_valid,
        (r2.left_x, r2.left_y, r2.left_pupil),
        r2.left_valid,
        w1,
        w2,
    );
    let (rx, ry, rp, rv) = lerp_eye(
        (r1.right_x, r1.right_y, r1.right_pupil),
        r1.right_valid,
        (r2.right_x, r2.right_y, r2.right_pupil),
        r2.right_valid,
        w1,
        w2,
    );

    GazeRecord {
        timestamp: t,
        left_x: lx,
        left_y: ly,
        left_pupil: lp,
        left_valid: lv,
        right_x: rx,
        right_y: ry,
        right_pupil: rp,
        right_valid: rv,
    }
}

/// Interpolate a converted record at time `t_ms` within a session trace.
///
/// Samples must be in append (non-decreasing time) order. An exact timestamp
/// hit returns that sample; times before the first or after the last sample
/// clamp to the boundary sample. Returns `None` on an empty trace.
pub fn interpolate_at(samples: &[ConvertedRecord], t_ms: f64) -> Option<ConvertedRecord> {
    if samples.is_empty() {
        return None;
    }

    // Nearest sample by absolute time difference
    let mut idx = 0;
    let mut best = f64::INFINITY;
    for (i, s) in samples.iter().enumerate() {
        let diff = (s.time_ms - t_ms).abs();
        if diff < best {
            best = diff;
            idx = i;
        }
    }

    if samples[idx].time_ms == t_ms {
        return Some(samples[idx]);
    }

    let (i1, i2) = if t_ms < samples[idx].time_ms {
        if idx == 0 {
            return Some(samples[0]);
        }
        (idx - 1, idx)
    } else {
        if idx == samples.len() - 1 {
            return Some(samples[idx]);
        }
        (idx, idx + 1)
    };

    let (s1, s2) = (&samples[i1], &samples[i2]);
    let span = s2.time_ms - s1.time_ms;
    let w1 = (s2.time_ms - t_ms) / span;
    let w2 = (t_ms - s1.time_ms) / span;

    let (lx, ly, lp, lv) = match (s1.left_valid, s2.left_valid) {
        (0, 0) => (f64::NAN, f64::NAN, f64::NAN, 0),
        (0, _) => (s2.left_x, s2.left_y, s2.left_pupil, 1),
        (_, 0) => (s1.left_x, s1.left_y, s1.left_pupil, 1),
        _ => (
            w1 * s1.left_x + w2 * s2.left_x,
            w1 * s1.left_y + w2 * s2.left_y,
            w1 * s1.left_pupil + w2 * s2.left_pupil,
            1,
        ),
    };
    let (rx, ry, rp, rv) = match (s1.right_valid, s2.right_valid) {
        (0, 0) => (f64::NAN, f64::NAN, f64::NAN, 0),
        (0, _) => (s2.right_x, s2.right_y, s2.right_pupil, 1),
        (_, 0) => (s1.right_x, s1.right_y, s1.right_pupil, 1),
        _ => (
            w1 * s1.right_x + w2 * s2.right_x,
            w1 * s1.right_y + w2 * s2.right_y,
            w1 * s1.right_pupil + w2 * s2.right_pupil,
            1,
        ),
    };

    let (ax, ay) = average_gaze((lx, ly), lv, (rx, ry), rv);

    Some(ConvertedRecord {
        time_ms: t_ms,
        left_x: lx,
        left_y: ly,
        left_pupil: lp,
        left_valid: lv,
        right_x: rx,
        right_y: ry,
        right_pupil: rp,
        right_valid: rv,
        avg_x: ax,
        avg_y: ay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: i64, x: f64, valid: u8) -> GazeRecord {
        GazeRecord {
            timestamp: t,
            left_x: x,
            left_y: x,
            left_pupil: 3.0,
            left_valid: valid,
            right_x: x + 0.1,
            right_y: x + 0.1,
            right_pupil: 3.2,
            right_valid: valid,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let r1 = record(1_000_000, 0.2, 1);
        let r2 = record(1_010_000, 0.4, 1);
        let t = 1_007_500;
        let span = (r2.timestamp - r1.timestamp) as f64;
        let w1 = (r2.timestamp - t) as f64 / span;
        let w2 = (t - r1.timestamp) as f64 / span;
        assert!((w1 + w2 - 1.0).abs() < 1e-12);

        let interp = interpolate_record(&r1, &r2, t);
        assert_eq!(interp.timestamp, t);
        assert!((interp.left_x - (0.25 * 0.2 + 0.75 * 0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_one_endpoint_invalid_copies_valid_endpoint() {
        let r1 = record(0, 0.2, 0);
        let r2 = record(10_000, 0.4, 1);
        let interp = interpolate_record(&r1, &r2, 5_000);
        assert_eq!(interp.left_valid, 1);
        assert!((interp.left_x - 0.4).abs() < 1e-12);

        let interp = interpolate_record(&r2, &record(20_000, 0.6, 0), 15_000);
        assert_eq!(interp.left_valid, 1);
        assert!((interp.left_x - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_both_endpoints_invalid_carries_raw_fields() {
        let r1 = record(0, 0.2, 0);
        let r2 = record(10_000, 0.4, 0);
        let interp = interpolate_record(&r1, &r2, 5_000);
        assert_eq!(interp.left_valid, 0);
        assert_eq!(interp.right_valid, 0);
        assert!((interp.left_x - 0.2).abs() < 1e-12);
    }

    fn converted(t_ms: f64, x: f64, valid: u8) -> ConvertedRecord {
        ConvertedRecord {
            time_ms: t_ms,
            left_x: x,
            left_y: x,
            left_pupil: 3.0,
            left_valid: valid,
            right_x: x,
            right_y: x,
            right_pupil: 3.0,
            right_valid: valid,
            avg_x: x,
            avg_y: x,
        }
    }

    #[test]
    fn test_interpolate_at_midpoint() {
        let samples = vec![converted(0.0, 0.0, 1), converted(10.0, 1.0, 1)];
        let s = interpolate_at(&samples, 5.0).unwrap();
        assert_eq!(s.time_ms, 5.0);
        assert!((s.left_x - 0.5).abs() < 1e-12);
        assert!((s.avg_x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_at_exact_hit_and_clamping() {
        let samples = vec![converted(0.0, 0.0, 1), converted(10.0, 1.0, 1)];
        assert_eq!(interpolate_at(&samples, 10.0).unwrap(), samples[1]);
        assert_eq!(interpolate_at(&samples, -5.0).unwrap(), samples[0]);
        assert_eq!(interpolate_at(&samples, 25.0).unwrap(), samples[1]);
        assert!(interpolate_at(&[], 0.0).is_none());
    }

    #[test]
    fn test_interpolate_at_invalid_eyes_yield_nan_average() {
        let samples = vec![converted(0.0, 0.0, 0), converted(10.0, 1.0, 0)];
        let s = interpolate_at(&samples, 5.0).unwrap();
        assert_eq!(s.left_valid, 0);
        assert!(s.avg_x.is_nan() && s.avg_y.is_nan());
    }
}
