//! Driver State Classifier
//!
//! Maps a window's vigilance metrics to Lucid / Drowsy / Asleep:
//! - Tiered PERCLOS rules with supporting signals
//! - Weighted risk score
//! - Data-quality gate on tracking confidence and frame rate
//! - Per-driver hysteresis that delays downgrades but never upgrades

pub mod bucket;
pub mod classifier;
pub mod config;
pub mod error;
pub mod memory;
pub mod reason;
pub mod risk;
pub mod rules;
pub mod state;

pub use bucket::StateBucket;
pub use classifier::{StateClassifier, StateResult, ThresholdsUsed};
pub use config::{HysteresisConfig, RiskRange, StateThresholds};
pub use error::ClassifierError;
pub use memory::{
    apply_hysteresis, ClassificationMemory, HysteresisDecision, HysteresisOutcome, MemoryEntry,
    MemoryKey,
};
pub use reason::{Reason, ReasonSet, ReasonValue, Relation};
pub use risk::{risk_score, state_risk};
pub use rules::{evaluate, evaluate_asleep, evaluate_drowsy, evaluate_lucid, Signals};
pub use state::{DriverState, StateConfidence};
