//! Temporal smoothing of converted gaze traces

use crate::types::ConvertedRecord;

/// Mean of the non-NaN values in a slice; NaN when none remain.
fn nan_mean(values: &[f64]) -> f64 {
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

/// Window bounds around index `i` for window size `n`.
///
/// Even `n` uses the half-open window `[i - n/2, i + n/2)`; odd `n` uses the
/// closed window `[i - (n-1)/2, i + (n-1)/2]`. Only the lower bound needs
/// clipping at the trace start. The even-window asymmetry is part of the
/// output format and must be preserved.
fn window_bounds(i: usize, n: usize, len: usize) -> (usize, usize) {
    if n % 2 == 0 {
        let offset = n / 2;
        (i.saturating_sub(offset), (i + offset).min(len))
    } else {
        let offset = (n - 1) / 2;
        (i.saturating_sub(offset), (i + offset + 1).min(len))
    }
}

/// Apply a NaN-ignoring moving average to a session's converted trace.
///
/// The eight positional and pupil channels are smoothed; timestamps and
/// validity flags pass through unchanged. Samples whose window holds no
/// usable value stay NaN.
pub fn moving_average(samples: &[ConvertedRecord], n: usize) -> Vec<ConvertedRecord> {
    let len = samples.len();
    let mut smoothed = Vec::with_capacity(len);

    let channel = |select: fn(&ConvertedRecord) -> f64| -> Vec<f64> {
        samples.iter().map(select).collect()
    };
    let channels: [Vec<f64>; 8] = [
        channel(|r| r.left_x),
        channel(|r| r.left_y),
        channel(|r| r.left_pupil),
        channel(|r| r.right_x),
        channel(|r| r.right_y),
        channel(|r| r.right_pupil),
        channel(|r| r.avg_x),
        channel(|r| r.avg_y),
    ];

    for (i, original) in samples.iter().enumerate() {
        let (lo, hi) = window_bounds(i, n, len);
        let mean = |c: &Vec<f64>| nan_mean(&c[lo..hi]);
        smoothed.push(ConvertedRecord {
            time_ms: original.time_ms,
            left_x: mean(&channels[0]),
            left_y: mean(&channels[1]),
            left_pupil: mean(&channels[2]),
            left_valid: original.left_valid,
            right_x: mean(&channels[3]),
            right_y: mean(&channels[4]),
            right_pupil: mean(&channels[5]),
            right_valid: original.right_valid,
            avg_x: mean(&channels[6]),
            avg_y: mean(&channels[7]),
        });
    }

    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t_ms: f64, x: f64) -> ConvertedRecord {
        ConvertedRecord {
            time_ms: t_ms,
            left_x: x,
            left_y: x,
            left_pupil: x,
            left_valid: 1,
            right_x: x,
            right_y: x,
            right_pupil: x,
            right_valid: 1,
            avg_x: x,
            avg_y: x,
        }
    }

    #[test]
    fn test_odd_window_is_centered() {
        let samples: Vec<_> = (0..5).map(|i| sample(i as f64, i as f64)).collect();
        let smoothed = moving_average(&samples, 3);
        // Middle of [1, 2, 3]
        assert_eq!(smoothed[2].left_x, 2.0);
        // Start clipped: mean of [0, 1]
        assert_eq!(smoothed[0].left_x, 0.5);
        // End: window [3, 4] after the upper clamp
        assert_eq!(smoothed[4].left_x, 3.5);
    }

    #[test]
    fn test_even_window_is_left_weighted() {
        let samples: Vec<_> = (0..5).map(|i| sample(i as f64, i as f64)).collect();
        let smoothed = moving_average(&samples, 4);
        // Half-open window [i-2, i+2): for i=2 that is samples 0..4
        assert_eq!(smoothed[2].left_x, 1.5);
        // i=0: clipped to [0, 2)
        assert_eq!(smoothed[0].left_x, 0.5);
    }

    #[test]
    fn test_single_value_surrounded_by_nan() {
        let mut samples: Vec<_> = (0..5).map(|i| sample(i as f64, f64::NAN)).collect();
        samples[2] = sample(2.0, 7.0);
        let smoothed = moving_average(&samples, 3);
        // Every window that includes index 2 returns its value
        assert_eq!(smoothed[1].left_x, 7.0);
        assert_eq!(smoothed[2].left_x, 7.0);
        assert_eq!(smoothed[3].left_x, 7.0);
        // Windows that exclude it stay NaN
        assert!(smoothed[0].left_x.is_nan());
        assert!(smoothed[4].left_x.is_nan());
    }

    #[test]
    fn test_timestamps_and_validity_pass_through() {
        let mut samples: Vec<_> = (0..3).map(|i| sample(i as f64 * 10.0, i as f64)).collect();
        samples[1].left_valid = 0;
        let smoothed = moving_average(&samples, 3);
        assert_eq!(smoothed[1].time_ms, 10.0);
        assert_eq!(smoothed[1].left_valid, 0);
        assert_eq!(smoothed[0].left_valid, 1);
    }

    #[test]
    fn test_zero_window_yields_nan() {
        let samples = vec![sample(0.0, 1.0)];
        let smoothed = moving_average(&samples, 0);
        assert!(smoothed[0].left_x.is_nan());
        assert_eq!(smoothed[0].time_ms, 0.0);
    }

    #[test]
    fn test_empty_trace() {
        assert!(moving_average(&[], 3).is_empty());
    }
}
