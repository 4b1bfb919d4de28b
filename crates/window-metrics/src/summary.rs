//! Window summary aggregation

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::duty::{integrate_duty, is_eye_closed, is_head_drooped};
use crate::sample::{RunStats, Sample};
use crate::threshold::{select_ear_pool, AdaptiveThreshold, EarPoolTier};
use crate::window::WindowBounds;
use crate::yawn::{detect_yawns, YawnEvent};

/// High-confidence frame ratio needed for an "OK" label
const CONFIDENCE_LABEL_MIN_RATIO: f64 = 0.6;

/// Tracking quality label for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Low")]
    Low,
}

impl ConfidenceLabel {
    pub fn from_ratio(high_confidence_ratio: f64) -> Self {
        if high_confidence_ratio >= CONFIDENCE_LABEL_MIN_RATIO {
            Self::Ok
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the PERCLOS figure can be trusted
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Samples with an EAR (measured or interpolated) over all samples
    pub valid_sample_ratio: f64,
    /// Interpolated samples over all samples
    pub interpolated_sample_ratio: f64,
    /// High-confidence frames over detected frames
    pub high_confidence_ratio: f64,
    /// Composite score in [0, 1]
    pub perclos_confidence_score: f64,
}

/// Aggregated metrics for one analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window_start: f64,
    pub window_end: f64,

    pub perclos_time: f64,
    pub perclos_ratio: f64,
    pub perclos_percent: f64,
    pub ear_threshold: f64,
    pub ear_pool: EarPoolTier,

    pub pitchdown_avg: f64,
    pub pitchdown_max: f64,
    pub droop_time: f64,
    pub droop_duty: f64,
    pub pitch_threshold: f64,

    pub mar_threshold: f64,
    pub yawn_count: usize,
    pub yawn_time: f64,
    pub yawn_duty: f64,
    pub yawn_peak: f64,
    pub yawn_events: Vec<YawnEvent>,

    pub confidence_label: ConfidenceLabel,
    pub fps_observed: f64,
    #[serde(flatten)]
    pub quality: QualityMetrics,
    pub stats: RunStats,
}

/// Combine a window's samples into its summary
pub fn summarize(
    samples: &[Sample],
    stats: &RunStats,
    bounds: &WindowBounds,
    config: &AnalyzerConfig,
) -> WindowSummary {
    let window = bounds.length();

    let (ear_pool, ear_values) = select_ear_pool(samples, config);
    let ear_threshold = AdaptiveThreshold::compute(&ear_values, &config.ear_threshold);
    let perclos_time = integrate_duty(samples, bounds, |s| {
        is_eye_closed(s, ear_threshold.value, config.confidence_threshold)
    });
    let perclos_ratio = perclos_time / window;

    let pitch_values: Vec<f64> = samples.iter().filter_map(|s| s.pitch_down_deg).collect();
    let pitch_threshold = AdaptiveThreshold::compute(&pitch_values, &config.pitch_threshold);
    let droop_time = integrate_duty(samples, bounds, |s| is_head_drooped(s, pitch_threshold.value));
    let (pitchdown_avg, pitchdown_max) = if pitch_values.is_empty() {
        (0.0, 0.0)
    } else {
        (
            pitch_values.iter().sum::<f64>() / pitch_values.len() as f64,
            pitch_values.iter().copied().fold(f64::MIN, f64::max),
        )
    };

    let mar_values: Vec<f64> = samples.iter().filter_map(|s| s.mar).collect();
    let mar_threshold = AdaptiveThreshold::compute(&mar_values, &config.mar_threshold);
    let yawn_events = detect_yawns(
        samples,
        bounds,
        mar_threshold.value,
        config.confidence_threshold,
        config.yawn,
    );
    let yawn_time: f64 = yawn_events.iter().map(YawnEvent::duration).sum();
    let yawn_peak = yawn_events.iter().map(|e| e.peak_mar).fold(0.0, f64::max);

    let high_confidence_ratio = if stats.detected_frames > 0 {
        stats.high_conf_frames as f64 / stats.detected_frames as f64
    } else {
        0.0
    };
    let fps_observed = stats.total_frames as f64 / window;

    let (valid_sample_ratio, interpolated_sample_ratio) = if samples.is_empty() {
        (0.0, 0.0)
    } else {
        let n = samples.len() as f64;
        let valid = samples.iter().filter(|s| s.ear.is_some()).count() as f64;
        (valid / n, stats.interpolated_samples as f64 / n)
    };

    let perclos_confidence_score = perclos_confidence_score(
        valid_sample_ratio,
        interpolated_sample_ratio,
        high_confidence_ratio,
        ear_values.len(),
        fps_observed,
    );

    WindowSummary {
        window_start: bounds.start,
        window_end: bounds.end,
        perclos_time,
        perclos_ratio,
        perclos_percent: perclos_ratio * 100.0,
        ear_threshold: ear_threshold.value,
        ear_pool,
        pitchdown_avg,
        pitchdown_max,
        droop_time,
        droop_duty: droop_time / window,
        pitch_threshold: pitch_threshold.value,
        mar_threshold: mar_threshold.value,
        yawn_count: yawn_events.len(),
        yawn_time,
        yawn_duty: yawn_time / window,
        yawn_peak,
        yawn_events,
        confidence_label: ConfidenceLabel::from_ratio(high_confidence_ratio),
        fps_observed,
        quality: QualityMetrics {
            valid_sample_ratio,
            interpolated_sample_ratio,
            high_confidence_ratio,
            perclos_confidence_score,
        },
        stats: *stats,
    }
}

/// Multiplicative trust score for a window's PERCLOS value
pub fn perclos_confidence_score(
    valid_ratio: f64,
    interpolated_ratio: f64,
    high_confidence_ratio: f64,
    threshold_samples: usize,
    fps: f64,
) -> f64 {
    let mut score = 1.0;

    if valid_ratio < 0.7 {
        score *= 0.6;
    } else if valid_ratio < 0.9 {
        score *= 0.8;
    }

    if interpolated_ratio > 0.3 {
        score *= 0.7;
    } else if interpolated_ratio > 0.1 {
        score *= 0.9;
    }

    if high_confidence_ratio < 0.4 {
        score *= 0.5;
    } else if high_confidence_ratio < 0.6 {
        score *= 0.8;
    }

    if threshold_samples < 5 {
        score *= 0.6;
    } else if threshold_samples < 10 {
        score *= 0.8;
    }

    if fps < 5.0 {
        score *= 0.7;
    } else if fps < 10.0 {
        score *= 0.9;
    }

    f64::clamp(score, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady(time: f64, ear: f64) -> Sample {
        Sample {
            time,
            ear: Some(ear),
            mar: Some(0.3),
            pitch_down_deg: Some(5.0),
            confidence: 0.9,
            has_face: true,
        }
    }

    #[test]
    fn test_confidence_score_penalties() {
        assert_eq!(perclos_confidence_score(1.0, 0.0, 1.0, 100, 30.0), 1.0);
        let worst = perclos_confidence_score(0.5, 0.5, 0.1, 2, 2.0);
        assert!((worst - 0.6 * 0.7 * 0.5 * 0.6 * 0.7).abs() < 1e-12);
        let mild = perclos_confidence_score(0.8, 0.2, 0.5, 7, 8.0);
        assert!((mild - 0.8 * 0.9 * 0.8 * 0.8 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_label_boundary() {
        assert_eq!(ConfidenceLabel::from_ratio(0.6), ConfidenceLabel::Ok);
        assert_eq!(ConfidenceLabel::from_ratio(0.59), ConfidenceLabel::Low);
        assert_eq!(serde_json::to_string(&ConfidenceLabel::Ok).unwrap(), r#""OK""#);
    }

    #[test]
    fn test_alert_window() {
        let bounds = WindowBounds::new(0.0, 10.0).unwrap();
        let samples: Vec<Sample> = (0..=100).map(|i| steady(i as f64 * 0.1, 0.3)).collect();
        let stats = RunStats {
            total_frames: 101,
            detected_frames: 101,
            high_conf_frames: 101,
            interpolated_samples: 0,
        };

        let summary = summarize(&samples, &stats, &bounds, &AnalyzerConfig::default());
        assert_eq!(summary.perclos_ratio, 0.0);
        assert_eq!(summary.ear_pool, EarPoolTier::Neutral);
        assert_eq!(summary.yawn_count, 0);
        assert_eq!(summary.confidence_label, ConfidenceLabel::Ok);
        assert!((summary.fps_observed - 10.1).abs() < 1e-9);
        assert_eq!(summary.pitchdown_max, 5.0);
        assert_eq!(summary.quality.perclos_confidence_score, 1.0);
    }

    #[test]
    fn test_summary_flattens_quality() {
        let bounds = WindowBounds::new(0.0, 1.0).unwrap();
        let samples = vec![steady(0.0, 0.3), steady(1.0, 0.3)];
        let summary = summarize(&samples, &RunStats::default(), &bounds, &AnalyzerConfig::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("perclos_confidence_score").is_some());
        assert_eq!(json["confidence_label"], "Low");
    }
}
