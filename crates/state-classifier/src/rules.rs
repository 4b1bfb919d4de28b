//! Tiered state rules
//!
//! Asleep rules are tried first, then drowsy, then lucid. Each rule returns
//! its own reasons so that only the winning tier's reasons reach the result.

use crate::bucket::StateBucket;
use crate::config::StateThresholds;
use crate::reason::{Reason, ReasonSet, Relation};
use crate::state::DriverState;

/// Bucket metrics with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    /// Closed-eye ratio in [0, 1]
    pub perclos: f64,
    /// EAR closure threshold of the window
    pub ear_threshold: f64,
    /// Mean head pitch-down, degrees
    pub pitchdown_avg: f64,
    /// Peak head pitch-down, degrees
    pub pitchdown_max: f64,
    /// Seconds spent with the head drooped
    pub droop_time: f64,
    /// Drooped share of the window in [0, 1]
    pub droop_duty: f64,
    /// Pitch-down threshold of the window, degrees
    pub pitch_threshold: f64,
    pub yawn_count: u32,
    /// Seconds spent yawning
    pub yawn_time: f64,
    /// Yawning share of the window in [0, 1]
    pub yawn_duty: f64,
    /// Highest mouth aspect ratio seen
    pub yawn_peak: f64,
    /// Tracking confidence label, "OK" when absent
    pub confidence: String,
    /// Effective frame rate, 0 when absent
    pub fps: f64,
}

impl Signals {
    /// Apply defaults to absent fields, recording a reason for each
    ///
    /// Ratios are clipped to [0, 1].
    pub fn extract(bucket: &StateBucket, reasons: &mut ReasonSet) -> Self {
        let mut number = |field: &str, value: Option<f64>| {
            value.unwrap_or_else(|| {
                reasons.push(Reason::missing(field));
                0.0
            })
        };

        let perclos = number("perclos", bucket.perclos).clamp(0.0, 1.0);
        let ear_threshold = number("ear_threshold", bucket.ear_threshold);
        let pitchdown_avg = number("pitchdown_avg", bucket.pitchdown_avg);
        let pitchdown_max = number("pitchdown_max", bucket.pitchdown_max);
        let droop_time = number("droop_time", bucket.droop_time);
        let droop_duty = number("droop_duty", bucket.droop_duty).clamp(0.0, 1.0);
        let pitch_threshold = number("pitch_threshold", bucket.pitch_threshold);
        let yawn_count = number("yawn_count", bucket.yawn_count.map(f64::from)) as u32;
        let yawn_time = number("yawn_time", bucket.yawn_time);
        let yawn_duty = number("yawn_duty", bucket.yawn_duty).clamp(0.0, 1.0);
        let yawn_peak = number("yawn_peak", bucket.yawn_peak);

        let confidence = match &bucket.confidence {
            Some(label) => label.clone(),
            None => {
                reasons.push(Reason::missing("confidence"));
                "OK".to_string()
            }
        };
        let fps = match bucket.fps {
            Some(fps) => fps,
            None => {
                reasons.push(Reason::missing("fps"));
                0.0
            }
        };

        Self {
            perclos,
            ear_threshold,
            pitchdown_avg,
            pitchdown_max,
            droop_time,
            droop_duty,
            pitch_threshold,
            yawn_count,
            yawn_time,
            yawn_duty,
            yawn_peak,
            confidence,
            fps,
        }
    }
}

/// Signals meeting the asleep confirmation thresholds
fn asleep_confirmers(s: &Signals, t: &StateThresholds) -> Vec<Reason> {
    let mut out = Vec::new();
    if s.droop_duty >= t.droop_duty_asleep {
        out.push(Reason::new("droop_duty", s.droop_duty, t.droop_duty_asleep, Relation::AtLeast));
    }
    if s.pitchdown_max >= t.pitchdown_asleep {
        out.push(Reason::new("pitchdown_max", s.pitchdown_max, t.pitchdown_asleep, Relation::AtLeast));
    }
    if s.yawn_duty >= t.yawn_duty_asleep {
        out.push(Reason::new("yawn_duty", s.yawn_duty, t.yawn_duty_asleep, Relation::AtLeast));
    }
    if s.yawn_count >= t.yawn_count_threshold {
        out.push(Reason::new("yawn_count", s.yawn_count, t.yawn_count_threshold, Relation::AtLeast));
    }
    out
}

/// Signals meeting the drowsy support thresholds
fn drowsy_supporters(s: &Signals, t: &StateThresholds) -> Vec<Reason> {
    let mut out = Vec::new();
    if s.yawn_duty >= t.yawn_duty_drowsy {
        out.push(Reason::new("yawn_duty", s.yawn_duty, t.yawn_duty_drowsy, Relation::AtLeast));
    }
    if s.yawn_count >= t.yawn_count_threshold {
        out.push(Reason::new("yawn_count", s.yawn_count, t.yawn_count_threshold, Relation::AtLeast));
    }
    if s.droop_duty >= t.droop_duty_asleep {
        out.push(Reason::new("droop_duty", s.droop_duty, t.droop_duty_asleep, Relation::AtLeast));
    }
    if s.pitchdown_max >= t.pitchdown_drowsy {
        out.push(Reason::new("pitchdown_max", s.pitchdown_max, t.pitchdown_drowsy, Relation::AtLeast));
    }
    out
}

fn with_perclos(perclos: f64, threshold: f64, mut rest: Vec<Reason>) -> Vec<Reason> {
    rest.insert(0, Reason::new("perclos", perclos, threshold, Relation::AtLeast));
    rest
}

/// Asleep rules A1-A3; `None` when none fires
pub fn evaluate_asleep(s: &Signals, t: &StateThresholds) -> Option<Vec<Reason>> {
    if s.perclos >= t.perclos_asleep_primary {
        return Some(with_perclos(s.perclos, t.perclos_asleep_primary, Vec::new()));
    }

    let confirmers = asleep_confirmers(s, t);
    if s.perclos >= t.perclos_asleep_confirm && !confirmers.is_empty() {
        return Some(with_perclos(s.perclos, t.perclos_asleep_confirm, confirmers));
    }
    if s.perclos >= t.perclos_asleep_broad && confirmers.len() >= 2 {
        return Some(with_perclos(s.perclos, t.perclos_asleep_broad, confirmers));
    }
    None
}

/// Drowsy rules D1-D2; `None` when none fires
pub fn evaluate_drowsy(s: &Signals, t: &StateThresholds) -> Option<Vec<Reason>> {
    if (t.perclos_drowsy_primary..t.perclos_asleep_primary).contains(&s.perclos) {
        return Some(with_perclos(s.perclos, t.perclos_drowsy_primary, Vec::new()));
    }

    if (t.perclos_drowsy_assist..t.perclos_drowsy_primary).contains(&s.perclos) {
        let supporters = drowsy_supporters(s, t);
        if !supporters.is_empty() {
            return Some(with_perclos(s.perclos, t.perclos_drowsy_assist, supporters));
        }
    }
    None
}

/// Lucid annotations: a near-threshold note when PERCLOS approaches drowsy
pub fn evaluate_lucid(s: &Signals, t: &StateThresholds) -> Vec<Reason> {
    if s.perclos >= t.perclos_lucid_near {
        vec![Reason::new("perclos", s.perclos, t.perclos_lucid_near, Relation::NearThreshold)]
    } else {
        Vec::new()
    }
}

/// Raw (pre-hysteresis) state and the reasons of the tier that produced it
pub fn evaluate(s: &Signals, t: &StateThresholds) -> (DriverState, Vec<Reason>) {
    if let Some(reasons) = evaluate_asleep(s, t) {
        return (DriverState::Asleep, reasons);
    }
    if let Some(reasons) = evaluate_drowsy(s, t) {
        return (DriverState::Drowsy, reasons);
    }
    (DriverState::Lucid, evaluate_lucid(s, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(perclos: f64) -> Signals {
        Signals {
            perclos,
            ear_threshold: 0.2,
            pitchdown_avg: 0.0,
            pitchdown_max: 0.0,
            droop_time: 0.0,
            droop_duty: 0.0,
            pitch_threshold: 15.0,
            yawn_count: 0,
            yawn_time: 0.0,
            yawn_duty: 0.0,
            yawn_peak: 0.0,
            confidence: "OK".to_string(),
            fps: 30.0,
        }
    }

    #[test]
    fn test_primary_asleep() {
        let (state, reasons) = evaluate(&signals(0.62), &StateThresholds::default());
        assert_eq!(state, DriverState::Asleep);
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].signal, "perclos");
    }

    #[test]
    fn test_confirmed_asleep_needs_a_confirmer() {
        let t = StateThresholds::default();
        assert_eq!(evaluate(&signals(0.55), &t).0, DriverState::Drowsy);

        let mut s = signals(0.55);
        s.droop_duty = 0.25;
        let (state, reasons) = evaluate(&s, &t);
        assert_eq!(state, DriverState::Asleep);
        assert_eq!(reasons.len(), 2);
    }

    #[test]
    fn test_broad_asleep_needs_two_confirmers() {
        let t = StateThresholds::default();
        let mut s = signals(0.47);
        s.yawn_count = 1;
        assert_eq!(evaluate(&s, &t).0, DriverState::Drowsy);

        s.pitchdown_max = 30.0;
        let (state, reasons) = evaluate(&s, &t);
        assert_eq!(state, DriverState::Asleep);
        assert_eq!(reasons.len(), 3);
    }

    #[test]
    fn test_primary_drowsy() {
        let (state, _) = evaluate(&signals(0.30), &StateThresholds::default());
        assert_eq!(state, DriverState::Drowsy);
    }

    #[test]
    fn test_assisted_drowsy() {
        let t = StateThresholds::default();
        assert_eq!(evaluate(&signals(0.22), &t).0, DriverState::Lucid);

        let mut s = signals(0.22);
        s.pitchdown_max = 21.0;
        let (state, reasons) = evaluate(&s, &t);
        assert_eq!(state, DriverState::Drowsy);
        assert_eq!(reasons[1].signal, "pitchdown_max");
    }

    #[test]
    fn test_lucid_near_threshold_note() {
        let t = StateThresholds::default();
        let (state, reasons) = evaluate(&signals(0.16), &t);
        assert_eq!(state, DriverState::Lucid);
        assert_eq!(reasons[0].relation, Relation::NearThreshold);
        assert!(evaluate(&signals(0.05), &t).1.is_empty());
    }

    #[test]
    fn test_missing_fields_defaulted() {
        let bucket = StateBucket {
            perclos: Some(1.4),
            fps: Some(25.0),
            ..StateBucket::empty(chrono::Utc::now(), "s", "d")
        };
        let mut reasons = ReasonSet::new();
        let s = Signals::extract(&bucket, &mut reasons);
        assert_eq!(s.perclos, 1.0);
        assert_eq!(s.confidence, "OK");
        assert_eq!(s.yawn_count, 0);
        // 13 fields, 2 supplied
        assert_eq!(reasons.len(), 11);
        assert!(reasons.into_vec().iter().all(|r| r.relation == Relation::Missing));
    }
}
