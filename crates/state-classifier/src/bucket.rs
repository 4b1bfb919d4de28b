//! Classifier input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use window_metrics::WindowSummary;

/// One window's metrics for one driver
///
/// Every metric is optional; absent fields are defaulted by the classifier
/// and reported as `missing:<field>` reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBucket {
    pub ts_end: DateTime<Utc>,
    pub session_id: String,
    pub driver_id: String,

    #[serde(default, alias = "perclos_15s")]
    pub perclos: Option<f64>,
    #[serde(default, alias = "ear_thresh_T")]
    pub ear_threshold: Option<f64>,
    #[serde(default, alias = "pitchdown_avg_15s")]
    pub pitchdown_avg: Option<f64>,
    #[serde(default, alias = "pitchdown_max_15s")]
    pub pitchdown_max: Option<f64>,
    #[serde(default, alias = "droop_time_15s")]
    pub droop_time: Option<f64>,
    #[serde(default, alias = "droop_duty_15s")]
    pub droop_duty: Option<f64>,
    #[serde(default, alias = "pitch_thresh_Tp")]
    pub pitch_threshold: Option<f64>,
    #[serde(default, alias = "yawn_count_15s")]
    pub yawn_count: Option<u32>,
    #[serde(default, alias = "yawn_time_15s")]
    pub yawn_time: Option<f64>,
    #[serde(default, alias = "yawn_duty_15s")]
    pub yawn_duty: Option<f64>,
    #[serde(default, alias = "yawn_peak_15s")]
    pub yawn_peak: Option<f64>,
    /// Tracking confidence label ("OK" or "Low")
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
}

impl StateBucket {
    /// Bucket with identity only and every metric absent
    pub fn empty(ts_end: DateTime<Utc>, session_id: impl Into<String>, driver_id: impl Into<String>) -> Self {
        Self {
            ts_end,
            session_id: session_id.into(),
            driver_id: driver_id.into(),
            perclos: None,
            ear_threshold: None,
            pitchdown_avg: None,
            pitchdown_max: None,
            droop_time: None,
            droop_duty: None,
            pitch_threshold: None,
            yawn_count: None,
            yawn_time: None,
            yawn_duty: None,
            yawn_peak: None,
            confidence: None,
            fps: None,
        }
    }

    /// Bucket carrying every metric of a window summary
    pub fn from_summary(
        summary: &WindowSummary,
        ts_end: DateTime<Utc>,
        session_id: impl Into<String>,
        driver_id: impl Into<String>,
    ) -> Self {
        Self {
            perclos: Some(summary.perclos_ratio),
            ear_threshold: Some(summary.ear_threshold),
            pitchdown_avg: Some(summary.pitchdown_avg),
            pitchdown_max: Some(summary.pitchdown_max),
            droop_time: Some(summary.droop_time),
            droop_duty: Some(summary.droop_duty),
            pitch_threshold: Some(summary.pitch_threshold),
            yawn_count: Some(u32::try_from(summary.yawn_count).unwrap_or(u32::MAX)),
            yawn_time: Some(summary.yawn_time),
            yawn_duty: Some(summary.yawn_duty),
            yawn_peak: Some(summary.yawn_peak),
            confidence: Some(summary.confidence_label.as_str().to_string()),
            fps: Some(summary.fps_observed),
            ..Self::empty(ts_end, session_id, driver_id)
        }
    }
}
