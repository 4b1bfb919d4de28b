//! Analysis Error Types

use thiserror::Error;

/// Errors raised while analyzing a window
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Frame source yielded nothing inside the window
    #[error("No frames were processed for window [{start:.2}s, {end:.2}s]")]
    NoFrames { start: f64, end: f64 },

    /// Requested window end lies past the end of the media
    #[error("Timestamp {timestamp:.2}s exceeds media duration {duration:.2}s")]
    TimestampBeyondDuration { timestamp: f64, duration: f64 },

    /// Timestamp string could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Window end precedes its start, or a bound is not finite
    #[error("Invalid window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame source failure
    #[error("Frame source error: {0}")]
    Source(String),
}
