//! Window analysis configuration

use face_geometry::LandmarkLayout;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Percentile threshold settings for one signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholdConfig {
    /// Value used when no sample qualifies
    pub default: f64,
    /// Clamp range for the computed threshold
    pub bounds: (f64, f64),
    /// Percentile in [0, 100]
    pub percentile: f64,
}

impl SignalThresholdConfig {
    pub const fn new(default: f64, bounds: (f64, f64), percentile: f64) -> Self {
        Self {
            default,
            bounds,
            percentile,
        }
    }

    fn validate(&self, signal: &str) -> Result<(), AnalysisError> {
        let (min, max) = self.bounds;
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} bounds ({}, {}) are not ordered",
                signal, min, max
            )));
        }
        if !(min..=max).contains(&self.default) {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} default {} lies outside bounds ({}, {})",
                signal, self.default, min, max
            )));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} percentile {} outside [0, 100]",
                signal, self.percentile
            )));
        }
        Ok(())
    }
}

/// Yawn state machine timings (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YawnConfig {
    /// How long MAR must stay above threshold before a yawn starts
    pub start_hold: f64,
    /// How long MAR must stay below threshold before a yawn ends
    pub end_hold: f64,
    /// Minimum gap between the end of one yawn and the start of the next
    pub refractory: f64,
}

impl Default for YawnConfig {
    fn default() -> Self {
        Self {
            start_hold: 0.5,
            end_hold: 0.2,
            refractory: 1.0,
        }
    }
}

/// Minimum pool sizes for each tier of the EAR threshold cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarPoolMinimums {
    pub neutral: usize,
    pub high_confidence: usize,
    pub moderate_confidence: usize,
}

impl Default for EarPoolMinimums {
    fn default() -> Self {
        Self {
            neutral: 10,
            high_confidence: 10,
            moderate_confidence: 5,
        }
    }
}

/// Window analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Window length ending at the requested timestamp
    pub window_seconds: f64,
    /// Shortest window analyzed near the start of a stream
    pub min_window_seconds: f64,

    /// Detection confidence counted as high quality
    pub confidence_threshold: f64,
    /// Detection confidence counted as moderate quality
    pub moderate_confidence: f64,
    /// Pitch-down above which a sample is not pose-neutral (degrees)
    pub down_pitch_gate_deg: f64,

    pub ear_threshold: SignalThresholdConfig,
    pub mar_threshold: SignalThresholdConfig,
    pub pitch_threshold: SignalThresholdConfig,
    pub ear_pool: EarPoolMinimums,

    pub yawn: YawnConfig,
    pub layout: LandmarkLayout,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_seconds: 15.0,
            min_window_seconds: 5.0,
            confidence_threshold: 0.5,
            moderate_confidence: 0.4,
            down_pitch_gate_deg: 25.0,
            ear_threshold: SignalThresholdConfig::new(0.20, (0.15, 0.32), 30.0),
            mar_threshold: SignalThresholdConfig::new(0.60, (0.45, 0.75), 70.0),
            pitch_threshold: SignalThresholdConfig::new(15.0, (10.0, 25.0), 65.0),
            ear_pool: EarPoolMinimums::default(),
            yawn: YawnConfig::default(),
            layout: LandmarkLayout::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Check every tunable for internal consistency
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.window_seconds.is_finite() && self.window_seconds > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "window_seconds must be positive, got {}",
                self.window_seconds
            )));
        }
        if !(self.min_window_seconds >= 0.0 && self.min_window_seconds <= self.window_seconds) {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_window_seconds {} must lie in [0, window_seconds]",
                self.min_window_seconds
            )));
        }
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("moderate_confidence", self.moderate_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} {} outside [0, 1]",
                    name, value
                )));
            }
        }

        self.ear_threshold.validate("ear_threshold")?;
        self.mar_threshold.validate("mar_threshold")?;
        self.pitch_threshold.validate("pitch_threshold")?;

        let y = &self.yawn;
        if [y.start_hold, y.end_hold, y.refractory]
            .iter()
            .any(|v| !(v.is_finite() && *v >= 0.0))
        {
            return Err(AnalysisError::InvalidConfig(
                "yawn hold and refractory durations must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
