//! State classifier
//!
//! Combines the tiered rules, the risk score and the data-quality gate, then
//! passes the raw state through the per-driver hysteresis memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::bucket::StateBucket;
use crate::config::{HysteresisConfig, StateThresholds};
use crate::error::ClassifierError;
use crate::memory::{ClassificationMemory, MemoryKey};
use crate::reason::{Reason, ReasonSet, Relation};
use crate::risk::state_risk;
use crate::rules::{evaluate, Signals};
use crate::state::{DriverState, StateConfidence};

/// Thresholds applied to a classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsUsed {
    /// PERCLOS that alone means asleep
    pub perclos_asleep_primary: f64,
    /// PERCLOS that means asleep with one confirming signal
    pub perclos_asleep_confirm: f64,
    /// PERCLOS that means asleep with two confirming signals
    pub perclos_asleep_broad: f64,
    /// PERCLOS that alone means drowsy
    pub perclos_drowsy_primary: f64,
    /// PERCLOS that means drowsy with a supporting signal
    pub perclos_drowsy_assist: f64,
    /// PERCLOS from which a lucid result is noted as near drowsy
    pub perclos_lucid_near: f64,
    /// Lowest frame rate trusted without a low-confidence mark
    pub fps_min_ok: f64,
}

impl From<&StateThresholds> for ThresholdsUsed {
    fn from(t: &StateThresholds) -> Self {
        Self {
            perclos_asleep_primary: t.perclos_asleep_primary,
            perclos_asleep_confirm: t.perclos_asleep_confirm,
            perclos_asleep_broad: t.perclos_asleep_broad,
            perclos_drowsy_primary: t.perclos_drowsy_primary,
            perclos_drowsy_assist: t.perclos_drowsy_assist,
            perclos_lucid_near: t.perclos_lucid_near,
            fps_min_ok: t.fps_min_ok,
        }
    }
}

/// Classification of one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResult {
    /// End of the classified bucket
    pub ts_end: DateTime<Utc>,
    pub session_id: String,
    pub driver_id: String,
    /// Reported state after hysteresis
    pub state: DriverState,
    /// State produced by the rules alone
    pub raw_state: DriverState,
    /// Risk in [0, 100]
    pub risk_score: u8,
    /// Low when the tracking confidence or frame rate fails the quality gate
    pub state_confidence: StateConfidence,
    /// Missing fields, quality gate failures, then the winning rule's signals
    pub reasons: Vec<Reason>,
    pub thresholds_used: ThresholdsUsed,
}

/// Rule-based driver state classifier with cross-window memory
#[derive(Debug)]
pub struct StateClassifier {
    thresholds: StateThresholds,
    hysteresis: HysteresisConfig,
    memory: Arc<ClassificationMemory>,
}

impl Default for StateClassifier {
    fn default() -> Self {
        Self {
            thresholds: StateThresholds::default(),
            hysteresis: HysteresisConfig::default(),
            memory: Arc::new(ClassificationMemory::new()),
        }
    }
}

impl StateClassifier {
    /// Create a classifier with its own empty memory
    pub fn new(thresholds: StateThresholds, hysteresis: HysteresisConfig) -> Result<Self, ClassifierError> {
        Self::with_memory(thresholds, hysteresis, Arc::new(ClassificationMemory::new()))
    }

    /// Create a classifier sharing an existing memory
    pub fn with_memory(
        thresholds: StateThresholds,
        hysteresis: HysteresisConfig,
        memory: Arc<ClassificationMemory>,
    ) -> Result<Self, ClassifierError> {
        thresholds.validate()?;
        hysteresis.validate()?;
        Ok(Self {
            thresholds,
            hysteresis,
            memory,
        })
    }

    pub fn thresholds(&self) -> &StateThresholds {
        &self.thresholds
    }

    pub fn hysteresis(&self) -> &HysteresisConfig {
        &self.hysteresis
    }

    pub fn memory(&self) -> &Arc<ClassificationMemory> {
        &self.memory
    }

    /// Classify one bucket and update the memory entry for its driver
    pub fn classify(&self, bucket: &StateBucket) -> StateResult {
        let t = &self.thresholds;
        let mut reasons = ReasonSet::new();
        let signals = Signals::extract(bucket, &mut reasons);

        let mut confidence = StateConfidence::Ok;
        if !signals.confidence.eq_ignore_ascii_case("OK") {
            reasons.push(Reason::new(
                "confidence",
                signals.confidence.as_str(),
                "OK",
                Relation::NotEqual,
            ));
            confidence = StateConfidence::Low;
        }
        if signals.fps < t.fps_min_ok {
            reasons.push(Reason::new("fps", signals.fps, t.fps_min_ok, Relation::Below));
            confidence = StateConfidence::Low;
        }

        let (raw_state, tier_reasons) = evaluate(&signals, t);
        reasons.extend(tier_reasons);
        let risk_score = state_risk(raw_state, &signals, t);

        let key: MemoryKey = (bucket.session_id.clone(), bucket.driver_id.clone());
        let outcome = self
            .memory
            .update(&key, raw_state, risk_score, bucket.ts_end, &self.hysteresis);

        info!(
            "bucket state session={} driver={} raw={} state={} risk={} confidence={} reasons={}",
            bucket.session_id,
            bucket.driver_id,
            raw_state,
            outcome.state,
            risk_score,
            confidence,
            reasons.len()
        );

        StateResult {
            ts_end: bucket.ts_end,
            session_id: bucket.session_id.clone(),
            driver_id: bucket.driver_id.clone(),
            state: outcome.state,
            raw_state,
            risk_score,
            state_confidence: confidence,
            reasons: reasons.into_vec(),
            thresholds_used: ThresholdsUsed::from(t),
        }
    }
}
