//! Window Vigilance Metrics
//!
//! Turns a window of per-frame landmark detections into a vigilance summary:
//! - Sample sequence with boundary padding and EAR gap filling
//! - Adaptive EAR / MAR / pitch thresholds
//! - PERCLOS and head-droop duty cycles
//! - Yawn events
//! - Quality metrics and a PERCLOS confidence score
//!
//! Everything here is computed per window with no state shared between calls.

pub mod analyzer;
pub mod config;
pub mod duty;
pub mod error;
pub mod sample;
pub mod summary;
pub mod threshold;
pub mod window;
pub mod yawn;

pub use analyzer::{
    frame_times, AnalyzedWindow, FrameSource, DEFAULT_FPS, LandmarkProvider, ObservedFrame,
    PrecomputedLandmarks, StreamMeta, TimedFrame, WindowAnalyzer,
};
pub use config::{AnalyzerConfig, EarPoolMinimums, SignalThresholdConfig, YawnConfig};
pub use duty::{integrate_duty, is_eye_closed, is_head_drooped};
pub use error::AnalysisError;
pub use sample::{interpolate_missing_ear, pad_boundaries, RunStats, Sample, SampleBuilder};
pub use summary::{perclos_confidence_score, summarize, ConfidenceLabel, QualityMetrics, WindowSummary};
pub use threshold::{percentile, select_ear_pool, AdaptiveThreshold, EarPoolTier};
pub use window::{parse_timestamp, resolve_window_end, WindowBounds};
pub use yawn::{detect_yawns, YawnDetector, YawnEvent};
