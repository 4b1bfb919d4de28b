//! Classifier configuration

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Normalization range for one risk input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRange {
    pub min: f64,
    pub max: f64,
}

impl RiskRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` within the range, clamped to [0, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Rule thresholds for state classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateThresholds {
    /// A1: PERCLOS alone
    pub perclos_asleep_primary: f64,
    /// A2: PERCLOS plus one confirmer
    pub perclos_asleep_confirm: f64,
    /// A3: PERCLOS plus two confirmers
    pub perclos_asleep_broad: f64,
    /// D1: PERCLOS alone
    pub perclos_drowsy_primary: f64,
    /// D2: PERCLOS plus one supporter
    pub perclos_drowsy_assist: f64,
    /// Informational band below drowsy
    pub perclos_lucid_near: f64,

    pub yawn_duty_asleep: f64,
    pub yawn_duty_drowsy: f64,
    pub yawn_count_threshold: u32,
    /// Droop duty confirming asleep and supporting drowsy
    pub droop_duty_asleep: f64,
    pub pitchdown_asleep: f64,
    pub pitchdown_drowsy: f64,

    pub perclos_risk: RiskRange,
    pub yawn_risk: RiskRange,
    pub droop_risk: RiskRange,

    /// Observed fps below which the result is marked low confidence
    pub fps_min_ok: f64,
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self {
            perclos_asleep_primary: 0.60,
            perclos_asleep_confirm: 0.50,
            perclos_asleep_broad: 0.45,
            perclos_drowsy_primary: 0.30,
            perclos_drowsy_assist: 0.20,
            perclos_lucid_near: 0.15,
            yawn_duty_asleep: 0.25,
            yawn_duty_drowsy: 0.15,
            yawn_count_threshold: 1,
            droop_duty_asleep: 0.20,
            pitchdown_asleep: 25.0,
            pitchdown_drowsy: 20.0,
            perclos_risk: RiskRange::new(0.08, 0.50),
            yawn_risk: RiskRange::new(0.10, 0.25),
            droop_risk: RiskRange::new(0.10, 0.40),
            fps_min_ok: 10.0,
        }
    }
}

impl StateThresholds {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let tiers = [
            ("perclos_lucid_near", self.perclos_lucid_near),
            ("perclos_drowsy_assist", self.perclos_drowsy_assist),
            ("perclos_drowsy_primary", self.perclos_drowsy_primary),
            ("perclos_asleep_broad", self.perclos_asleep_broad),
            ("perclos_asleep_confirm", self.perclos_asleep_confirm),
            ("perclos_asleep_primary", self.perclos_asleep_primary),
        ];
        for (name, value) in tiers {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassifierError::InvalidConfig(format!(
                    "{} {} outside [0, 1]",
                    name, value
                )));
            }
        }
        for pair in tiers.windows(2) {
            let ((lower_name, lower), (upper_name, upper)) = (pair[0], pair[1]);
            if lower > upper {
                return Err(ClassifierError::InvalidConfig(format!(
                    "{} ({}) exceeds {} ({})",
                    lower_name, lower, upper_name, upper
                )));
            }
        }

        for (name, range) in [
            ("perclos_risk", self.perclos_risk),
            ("yawn_risk", self.yawn_risk),
            ("droop_risk", self.droop_risk),
        ] {
            if !(range.max > range.min) {
                return Err(ClassifierError::InvalidConfig(format!(
                    "{} range ({}, {}) is empty",
                    name, range.min, range.max
                )));
            }
        }

        if !(self.fps_min_ok >= 0.0) {
            return Err(ClassifierError::InvalidConfig(format!(
                "fps_min_ok must be non-negative, got {}",
                self.fps_min_ok
            )));
        }
        Ok(())
    }
}

/// Cross-window hysteresis settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Seconds after which a stored state is forgotten
    pub inactivity_seconds: f64,
    /// Downgrades with a risk score below this are accepted at once
    pub downgrade_risk_ceiling: u8,
    /// Consecutive lower classifications needed to accept a downgrade
    pub downgrade_confirmations: u32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            inactivity_seconds: 300.0,
            downgrade_risk_ceiling: 40,
            downgrade_confirmations: 2,
        }
    }
}

impl HysteresisConfig {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if !(self.inactivity_seconds.is_finite() && self.inactivity_seconds > 0.0) {
            return Err(ClassifierError::InvalidConfig(format!(
                "inactivity_seconds must be positive, got {}",
                self.inactivity_seconds
            )));
        }
        if self.downgrade_confirmations == 0 {
            return Err(ClassifierError::InvalidConfig(
                "downgrade_confirmations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(StateThresholds::default().validate().is_ok());
        assert!(HysteresisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unordered_tiers_rejected() {
        let thresholds = StateThresholds {
            perclos_drowsy_primary: 0.7,
            ..Default::default()
        };
        assert!(matches!(thresholds.validate(), Err(ClassifierError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_risk_range_rejected() {
        let thresholds = StateThresholds {
            yawn_risk: RiskRange::new(0.2, 0.2),
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        let config = HysteresisConfig {
            downgrade_confirmations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_clamps() {
        let range = RiskRange::new(0.1, 0.3);
        assert_eq!(range.normalize(0.0), 0.0);
        assert!((range.normalize(0.2) - 0.5).abs() < 1e-12);
        assert_eq!(range.normalize(0.9), 1.0);
    }
}
