//! Recorded landmark windows

use chrono::{DateTime, Utc};
use face_geometry::{FrameSize, LandmarkFrame};
use serde::{Deserialize, Serialize};
use window_metrics::{
    frame_times, parse_timestamp, AnalysisError, FrameSource, ObservedFrame, StreamMeta, TimedFrame,
    WindowBounds,
};

/// Window end as seconds or a timecode string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Seconds(f64),
    Timecode(String),
}

impl Timestamp {
    pub fn seconds(&self) -> Result<f64, AnalysisError> {
        match self {
            Self::Seconds(s) => parse_timestamp(&s.to_string()),
            Self::Timecode(text) => parse_timestamp(text),
        }
    }
}

/// One window of precomputed landmark detections
///
/// ```json
/// {"timestamp": "00:15", "duration": 60.0, "size": {"width": 640, "height": 480},
///  "frames": [{"time": 0.0, "landmarks": [{"x": 0.41, "y": 0.38, "z": -0.02}, null]}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedWindow {
    pub timestamp: Timestamp,
    /// Stream length in seconds, if known
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Rate to sample frames at; estimated from frame times when absent
    #[serde(default)]
    pub fps: Option<f64>,
    pub size: FrameSize,
    #[serde(default)]
    pub frames: Vec<ObservedFrame>,
}

impl RecordedWindow {
    fn timed(frame: &ObservedFrame) -> TimedFrame<Option<LandmarkFrame>> {
        TimedFrame {
            time: frame.time,
            frame: frame.landmarks.clone(),
        }
    }

    fn time_span(&self) -> Option<(f64, f64)> {
        let times = self.frames.iter().map(|f| f.time).filter(|t| t.is_finite());
        let first = times.clone().fold(f64::INFINITY, f64::min);
        let last = times.fold(f64::NEG_INFINITY, f64::max);
        (first <= last).then_some((first, last))
    }

    fn estimated_fps(&self) -> f64 {
        if let Some(fps) = self.fps.filter(|f| *f > 0.0) {
            return fps;
        }
        match self.time_span() {
            Some((first, last)) if self.frames.len() >= 2 && last > first => {
                (self.frames.len() - 1) as f64 / (last - first)
            }
            _ => 0.0,
        }
    }

    /// Stated duration, or the end of the last recorded frame
    fn duration(&self, fps: f64) -> Option<f64> {
        self.duration.or_else(|| {
            let (_, last) = self.time_span()?;
            let period = if fps > 0.0 { 1.0 / fps } else { 0.0 };
            Some(last + period)
        })
    }
}

impl FrameSource for RecordedWindow {
    type Frame = Option<LandmarkFrame>;

    fn meta(&self) -> StreamMeta {
        let fps = self.estimated_fps();
        StreamMeta {
            fps,
            frame_count: self.frames.len(),
            duration: self.duration(fps),
            size: self.size,
            recorded_at: self.recorded_at,
        }
    }

    fn frames(
        &mut self,
        bounds: &WindowBounds,
        fps: f64,
    ) -> Result<Vec<TimedFrame<Self::Frame>>, AnalysisError> {
        let mut in_window: Vec<&ObservedFrame> = self
            .frames
            .iter()
            .filter(|f| f.time.is_finite() && bounds.contains(f.time))
            .collect();
        in_window.sort_by(|a, b| a.time.total_cmp(&b.time));

        if !(fps.is_finite() && fps > 0.0) {
            return Ok(in_window.into_iter().map(Self::timed).collect());
        }

        // nearest recorded frame to each nominal frame time
        let mut frames = Vec::new();
        let mut last_index = None;
        for t in frame_times(bounds, fps) {
            let after = in_window.partition_point(|f| f.time < t);
            let nearest = [after.checked_sub(1), (after < in_window.len()).then_some(after)]
                .into_iter()
                .flatten()
                .min_by(|&a, &b| {
                    (in_window[a].time - t)
                        .abs()
                        .total_cmp(&(in_window[b].time - t).abs())
                });
            if let Some(index) = nearest.filter(|i| last_index != Some(*i)) {
                frames.push(Self::timed(in_window[index]));
                last_index = Some(index);
            }
        }
        Ok(frames)
    }
}
