//! Window bounds and timestamp handling

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;

/// Floor for the window length used as a divisor
const MIN_WINDOW_LENGTH: f64 = 1e-6;

/// Closed analysis interval on the stream timeline (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub start: f64,
    pub end: f64,
}

impl WindowBounds {
    pub fn new(start: f64, end: f64) -> Result<Self, AnalysisError> {
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(AnalysisError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window ending at `timestamp` for a stream of (optionally) known duration
    ///
    /// Near the start of the stream the window is cut off at zero; if the
    /// timestamp is also shorter than `min_window_seconds`, the end is pushed
    /// out to the minimum viable window (capped by the duration).
    pub fn resolve(
        timestamp: f64,
        duration: Option<f64>,
        window_seconds: f64,
        min_window_seconds: f64,
    ) -> Result<Self, AnalysisError> {
        let known_duration = duration.filter(|d| *d > 0.0);
        if let Some(duration) = known_duration {
            if timestamp > duration {
                return Err(AnalysisError::TimestampBeyondDuration { timestamp, duration });
            }
        }

        let mut start = timestamp - window_seconds;
        let mut end = timestamp;
        if start < 0.0 {
            start = 0.0;
            if timestamp < min_window_seconds {
                end = known_duration.map_or(min_window_seconds, |d| d.min(min_window_seconds));
                debug!("Extended short window: {:.2}s -> {:.2}s", timestamp, end);
            }
        }

        Self::new(start, end)
    }

    /// Length used as a ratio denominator, never zero
    pub fn length(&self) -> f64 {
        (self.end - self.start).max(MIN_WINDOW_LENGTH)
    }

    /// Clamp a time into the window
    pub fn clamp(&self, time: f64) -> f64 {
        time.clamp(self.start, self.end)
    }

    pub fn contains(&self, time: f64) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

/// Parse seconds ("12.5") or a timecode ("MM:SS", "HH:MM:SS.mmm")
pub fn parse_timestamp(value: &str) -> Result<f64, AnalysisError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AnalysisError::InvalidTimestamp("timestamp is required".to_string()));
    }

    if let Ok(seconds) = value.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            return Ok(seconds);
        }
        return Err(AnalysisError::InvalidTimestamp(format!(
            "timestamp must be non-negative: {}",
            value
        )));
    }

    if value.contains(':') {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() > 3 {
            return Err(AnalysisError::InvalidTimestamp(format!("invalid timecode: {}", value)));
        }
        let mut seconds = 0.0;
        for part in parts {
            let component = part
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| AnalysisError::InvalidTimestamp(format!("invalid timecode: {}", value)))?;
            seconds = seconds * 60.0 + component;
        }
        return Ok(seconds);
    }

    Err(AnalysisError::InvalidTimestamp(format!(
        "unable to parse timestamp '{}'",
        value
    )))
}

/// Wall-clock instant of a stream offset
///
/// Uses the recording start time when known, otherwise the current time.
/// Offsets that land outside the representable date range are rejected.
pub fn resolve_window_end(
    recorded_at: Option<DateTime<Utc>>,
    offset_seconds: f64,
) -> Result<DateTime<Utc>, AnalysisError> {
    let Some(start) = recorded_at else {
        return Ok(Utc::now());
    };

    let millis = (offset_seconds * 1000.0).round();
    let end = if millis.is_finite() {
        TimeDelta::try_milliseconds(millis as i64).and_then(|offset| start.checked_add_signed(offset))
    } else {
        None
    };
    end.ok_or_else(|| {
        AnalysisError::InvalidTimestamp(format!(
            "offset {}s from {} is outside the supported date range",
            offset_seconds, start
        ))
    })
}
