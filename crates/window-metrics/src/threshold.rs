//! Adaptive per-window thresholds

use serde::{Deserialize, Serialize};

use crate::config::{AnalyzerConfig, SignalThresholdConfig};
use crate::sample::Sample;

/// Threshold chosen for one signal in one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThreshold {
    pub value: f64,
    pub bounds: (f64, f64),
    pub percentile: f64,
    /// Number of values the percentile was taken over
    pub sample_count: usize,
}

impl AdaptiveThreshold {
    /// Bounded percentile of `values`, or the configured default when empty
    pub fn compute(values: &[f64], config: &SignalThresholdConfig) -> Self {
        let (min, max) = config.bounds;
        let value = match percentile(values, config.percentile) {
            Some(p) => p.clamp(min, max),
            None => config.default.clamp(min, max),
        };
        Self {
            value,
            bounds: config.bounds,
            percentile: config.percentile,
            sample_count: values.len(),
        }
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `None` for an empty slice. Non-finite values are ignored.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Which quality tier supplied the EAR threshold pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarPoolTier {
    /// High confidence and pose-neutral
    Neutral,
    HighConfidence,
    ModerateConfidence,
    /// Every sample with an EAR
    All,
}

/// EAR values for thresholding, from the best tier with enough samples
pub fn select_ear_pool(samples: &[Sample], config: &AnalyzerConfig) -> (EarPoolTier, Vec<f64>) {
    let gate = config.down_pitch_gate_deg;
    let high = config.confidence_threshold;
    let moderate_floor = config.moderate_confidence;
    let minimums = &config.ear_pool;

    let collect = |keep: &dyn Fn(&Sample) -> bool| -> Vec<f64> {
        samples
            .iter()
            .filter(|s| keep(s))
            .filter_map(|s| s.ear)
            .collect()
    };

    let neutral = collect(&|s: &Sample| s.is_confident(high) && s.pitch_down_deg.map_or(true, |p| p <= gate));
    if neutral.len() >= minimums.neutral {
        return (EarPoolTier::Neutral, neutral);
    }
    let confident = collect(&|s: &Sample| s.is_confident(high));
    if confident.len() >= minimums.high_confidence {
        return (EarPoolTier::HighConfidence, confident);
    }
    let moderate = collect(&|s: &Sample| s.is_confident(moderate_floor));
    if moderate.len() >= minimums.moderate_confidence {
        return (EarPoolTier::ModerateConfidence, moderate);
    }
    (EarPoolTier::All, collect(&|_: &Sample| true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ear: f64, confidence: f64, pitch: Option<f64>) -> Sample {
        Sample {
            time: 0.0,
            ear: Some(ear),
            mar: None,
            pitch_down_deg: pitch,
            confidence,
            has_face: true,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [0.1, 0.4, 0.2, 0.3];
        assert_eq!(percentile(&values, 0.0), Some(0.1));
        assert_eq!(percentile(&values, 100.0), Some(0.4));
        // rank 0.9 between 0.1 and 0.2
        assert!((percentile(&values, 30.0).unwrap() - 0.19).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_threshold_clamped_and_defaulted() {
        let config = SignalThresholdConfig::new(0.20, (0.15, 0.32), 30.0);
        assert_eq!(AdaptiveThreshold::compute(&[0.05, 0.06], &config).value, 0.15);
        assert_eq!(AdaptiveThreshold::compute(&[0.5, 0.6], &config).value, 0.32);

        let empty = AdaptiveThreshold::compute(&[], &config);
        assert_eq!(empty.value, 0.20);
        assert_eq!(empty.sample_count, 0);
    }

    #[test]
    fn test_pool_prefers_neutral_pose() {
        let config = AnalyzerConfig::default();
        let mut samples: Vec<Sample> = (0..10).map(|_| sample(0.3, 0.9, Some(5.0))).collect();
        samples.push(sample(0.1, 0.9, Some(40.0)));

        let (tier, pool) = select_ear_pool(&samples, &config);
        assert_eq!(tier, EarPoolTier::Neutral);
        assert_eq!(pool.len(), 10);
    }

    #[test]
    fn test_pool_cascade() {
        let config = AnalyzerConfig::default();

        // head-down but confident
        let samples: Vec<Sample> = (0..10).map(|_| sample(0.3, 0.9, Some(40.0))).collect();
        assert_eq!(select_ear_pool(&samples, &config).0, EarPoolTier::HighConfidence);

        let samples: Vec<Sample> = (0..6).map(|_| sample(0.3, 0.45, None)).collect();
        assert_eq!(select_ear_pool(&samples, &config).0, EarPoolTier::ModerateConfidence);

        let samples: Vec<Sample> = (0..3).map(|_| sample(0.3, 0.1, None)).collect();
        let (tier, pool) = select_ear_pool(&samples, &config);
        assert_eq!(tier, EarPoolTier::All);
        assert_eq!(pool.len(), 3);
    }
}
