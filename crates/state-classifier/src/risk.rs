//! Risk score

use crate::config::StateThresholds;
use crate::rules::Signals;
use crate::state::DriverState;

const PERCLOS_WEIGHT: f64 = 0.70;
const YAWN_WEIGHT: f64 = 0.15;
const DROOP_WEIGHT: f64 = 0.15;
/// Minimum score reported for an asleep classification
const ASLEEP_RISK_FLOOR: u8 = 90;

/// Weighted PERCLOS / yawn / droop risk in [0, 100]
pub fn risk_score(s: &Signals, t: &StateThresholds) -> u8 {
    let p = t.perclos_risk.normalize(s.perclos);
    let y = t.yawn_risk.normalize(s.yawn_duty);
    let d = t.droop_risk.normalize(s.droop_duty);

    let score = PERCLOS_WEIGHT * p + YAWN_WEIGHT * y + DROOP_WEIGHT * d;
    (100.0 * score).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Risk score with the asleep floor applied
pub fn state_risk(state: DriverState, s: &Signals, t: &StateThresholds) -> u8 {
    let risk = risk_score(s, t);
    if state == DriverState::Asleep {
        risk.max(ASLEEP_RISK_FLOOR)
    } else {
        risk
    }
}
