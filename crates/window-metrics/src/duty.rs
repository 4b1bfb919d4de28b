//! Time-weighted duty cycles over irregular samples

use crate::sample::Sample;
use crate::window::WindowBounds;

/// Below this confidence a sample always counts as eyes closed
const LOW_CONFIDENCE_FLOOR: f64 = 0.3;
/// Threshold scale for samples between the floor and the confidence threshold
const RELAXED_THRESHOLD_FACTOR: f64 = 0.8;

/// Seconds within `bounds` for which `predicate` held
///
/// The predicate is treated as a step function: each sample's value holds
/// until the next sample, and the last value holds until the window end.
/// The first sample's value is assumed from the window start.
pub fn integrate_duty<F>(samples: &[Sample], bounds: &WindowBounds, predicate: F) -> f64
where
    F: Fn(&Sample) -> bool,
{
    let Some(first) = samples.first() else {
        return 0.0;
    };

    let mut total = 0.0;
    let mut prev_time = bounds.start;
    let mut prev_state = predicate(first);

    for sample in samples {
        let t = bounds.clamp(sample.time);
        let dt = (t - prev_time).max(0.0);
        if prev_state {
            total += dt;
        }
        prev_time = t;
        prev_state = predicate(sample);
    }

    if prev_state {
        total += (bounds.end - prev_time).max(0.0);
    }

    total.clamp(0.0, bounds.end - bounds.start)
}

/// Eye-closure predicate used for PERCLOS
///
/// Missing faces and missing EAR count as closed. Low-confidence samples are
/// judged against a relaxed threshold, and very low confidence counts as
/// closed regardless of EAR.
pub fn is_eye_closed(sample: &Sample, ear_threshold: f64, confidence_threshold: f64) -> bool {
    if !sample.has_face {
        return true;
    }
    let Some(ear) = sample.ear else {
        return true;
    };

    if sample.confidence < confidence_threshold {
        if sample.confidence < LOW_CONFIDENCE_FLOOR {
            return true;
        }
        return ear < ear_threshold * RELAXED_THRESHOLD_FACTOR;
    }
    ear < ear_threshold
}

/// Head-droop predicate: pitch-down at or above the threshold
pub fn is_head_drooped(sample: &Sample, pitch_threshold: f64) -> bool {
    sample.pitch_down_deg.map_or(false, |p| p >= pitch_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_eye(time: f64, ear: f64, confidence: f64) -> Sample {
        Sample {
            time,
            ear: Some(ear),
            mar: None,
            pitch_down_deg: None,
            confidence,
            has_face: true,
        }
    }

    #[test]
    fn test_step_integration() {
        let bounds = WindowBounds::new(0.0, 10.0).unwrap();
        // closed on [0, 2), open on [2, 6), closed on [6, 10]
        let samples = vec![
            open_eye(0.0, 0.1, 0.9),
            open_eye(2.0, 0.3, 0.9),
            open_eye(6.0, 0.1, 0.9),
            open_eye(10.0, 0.1, 0.9),
        ];
        let closed = integrate_duty(&samples, &bounds, |s| is_eye_closed(s, 0.2, 0.5));
        assert!((closed - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_irregular_spacing() {
        let bounds = WindowBounds::new(0.0, 1.0).unwrap();
        let samples = vec![
            open_eye(0.0, 0.3, 0.9),
            open_eye(0.1, 0.1, 0.9),
            open_eye(0.7, 0.3, 0.9),
            open_eye(1.0, 0.3, 0.9),
        ];
        let closed = integrate_duty(&samples, &bounds, |s| is_eye_closed(s, 0.2, 0.5));
        assert!((closed - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_tail_extends_to_window_end() {
        let bounds = WindowBounds::new(0.0, 5.0).unwrap();
        let samples = vec![open_eye(1.0, 0.1, 0.9)];
        let closed = integrate_duty(&samples, &bounds, |s| is_eye_closed(s, 0.2, 0.5));
        assert_eq!(closed, 5.0);
        assert_eq!(integrate_duty(&[], &bounds, |_| true), 0.0);
    }

    #[test]
    fn test_no_face_is_closed() {
        assert!(is_eye_closed(&Sample::no_face(0.0), 0.2, 0.5));
        let mut missing = open_eye(0.0, 0.3, 0.9);
        missing.ear = None;
        assert!(is_eye_closed(&missing, 0.2, 0.5));
    }

    #[test]
    fn test_low_confidence_floor() {
        assert!(is_eye_closed(&open_eye(0.0, 0.35, 0.2), 0.2, 0.5));
    }

    #[test]
    fn test_relaxed_threshold() {
        // 0.17 is below 0.2 but above 0.8 * 0.2
        assert!(!is_eye_closed(&open_eye(0.0, 0.17, 0.4), 0.2, 0.5));
        assert!(is_eye_closed(&open_eye(0.0, 0.15, 0.4), 0.2, 0.5));
        assert!(is_eye_closed(&open_eye(0.0, 0.17, 0.9), 0.2, 0.5));
    }

    #[test]
    fn test_droop_predicate() {
        let mut sample = open_eye(0.0, 0.3, 0.9);
        assert!(!is_head_drooped(&sample, 15.0));
        sample.pitch_down_deg = Some(15.0);
        assert!(is_head_drooped(&sample, 15.0));
        sample.pitch_down_deg = Some(14.9);
        assert!(!is_head_drooped(&sample, 15.0));
    }
}
