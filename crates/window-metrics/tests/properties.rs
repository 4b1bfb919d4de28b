use proptest::prelude::*;

use window_metrics::{
    integrate_duty, interpolate_missing_ear, pad_boundaries, summarize, AdaptiveThreshold,
    AnalyzerConfig, RunStats, Sample, SignalThresholdConfig, WindowBounds,
};

fn sample_at(time: f64) -> impl Strategy<Value = Sample> {
    (
        prop::option::weighted(0.8, 0.05_f64..0.45),
        prop::option::weighted(0.7, 0.1_f64..1.2),
        prop::option::weighted(0.6, 0.0_f64..45.0),
        0.0_f64..1.0,
        prop::bool::weighted(0.85),
    )
        .prop_map(move |(ear, mar, pitch, confidence, has_face)| {
            if has_face {
                Sample {
                    time,
                    ear,
                    mar,
                    pitch_down_deg: pitch,
                    confidence,
                    has_face,
                }
            } else {
                Sample::no_face(time)
            }
        })
}

/// Sorted samples strictly inside [0, 15]
fn window_samples() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec(0.0_f64..15.0, 1..120).prop_flat_map(|mut times| {
        times.sort_by(f64::total_cmp);
        times.into_iter().map(sample_at).collect::<Vec<_>>()
    })
}

fn stats_for(samples: &[Sample]) -> RunStats {
    let detected = samples.iter().filter(|s| s.has_face).count();
    RunStats {
        total_frames: samples.len(),
        detected_frames: detected,
        high_conf_frames: samples.iter().filter(|s| s.is_confident(0.5)).count(),
        interpolated_samples: 0,
    }
}

proptest! {
    #[test]
    fn pt_ratios_in_unit_interval(samples in window_samples()) {
        let bounds = WindowBounds::new(0.0, 15.0).unwrap();
        let config = AnalyzerConfig::default();
        let padded = pad_boundaries(samples, &bounds);
        let (filled, _) = interpolate_missing_ear(&padded);
        let summary = summarize(&filled, &stats_for(&filled), &bounds, &config);

        prop_assert!((0.0..=1.0).contains(&summary.perclos_ratio));
        prop_assert!((0.0..=1.0).contains(&summary.droop_duty));
        prop_assert!((0.0..=1.0).contains(&summary.yawn_duty));
        prop_assert!((0.0..=1.0).contains(&summary.quality.perclos_confidence_score));
    }

    #[test]
    fn pt_padding_spans_window(samples in window_samples()) {
        let bounds = WindowBounds::new(0.0, 15.0).unwrap();
        let padded = pad_boundaries(samples, &bounds);
        prop_assert_eq!(padded.first().map(|s| s.time), Some(0.0));
        prop_assert_eq!(padded.last().map(|s| s.time), Some(15.0));
        prop_assert!(padded.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn pt_interpolation_never_overwrites(samples in window_samples()) {
        let (filled, count) = interpolate_missing_ear(&samples);
        prop_assert_eq!(filled.len(), samples.len());
        let mut changed = 0;
        for (before, after) in samples.iter().zip(&filled) {
            if before.ear.is_some() {
                prop_assert_eq!(before.ear, after.ear);
            } else if after.ear.is_some() {
                changed += 1;
                prop_assert!(after.confidence >= 0.4);
            }
        }
        prop_assert_eq!(changed, count);
    }

    #[test]
    fn pt_threshold_within_bounds(
        values in prop::collection::vec(-1.0_f64..2.0, 0..50),
        percentile in 0.0_f64..=100.0,
    ) {
        let config = SignalThresholdConfig::new(0.2, (0.15, 0.32), percentile);
        let t = AdaptiveThreshold::compute(&values, &config);
        prop_assert!(t.value >= 0.15 && t.value <= 0.32);
    }

    #[test]
    fn pt_duty_additive_under_split(samples in window_samples(), split in 0.5_f64..14.5) {
        let full = WindowBounds::new(0.0, 15.0).unwrap();
        let padded = pad_boundaries(samples, &full);
        let closed = |s: &Sample| s.ear.map_or(true, |e| e < 0.2);

        // state in effect at the split point
        let Some(at_split) = padded.iter().rev().find(|s| s.time <= split).copied() else {
            return Ok(());
        };
        let mut left: Vec<Sample> = padded.iter().filter(|s| s.time <= split).copied().collect();
        left.push(at_split.at(split));
        let mut right = vec![at_split.at(split)];
        right.extend(padded.iter().filter(|s| s.time > split).copied());

        let whole = integrate_duty(&padded, &full, closed);
        let first = integrate_duty(&left, &WindowBounds::new(0.0, split).unwrap(), closed);
        let second = integrate_duty(&right, &WindowBounds::new(split, 15.0).unwrap(), closed);
        prop_assert!((whole - (first + second)).abs() < 1e-9);
    }
}
