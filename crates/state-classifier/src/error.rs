//! Classifier Error Types

use thiserror::Error;

/// Errors raised when building a classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    /// Threshold or hysteresis configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
