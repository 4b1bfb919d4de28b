//! Window analyzer and its input seams

use chrono::{DateTime, Utc};
use face_geometry::{measure, FrameSize, LandmarkFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::sample::SampleBuilder;
use crate::summary::{summarize, WindowSummary};
use crate::window::{resolve_window_end, WindowBounds};

/// Frame rate assumed when a source cannot report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Stream properties reported by a frame source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamMeta {
    /// Nominal frame rate, `0.0` when unknown
    pub fps: f64,
    /// Total frames in the stream, `0` when unknown
    pub frame_count: usize,
    /// Stream length in seconds, if known
    pub duration: Option<f64>,
    pub size: FrameSize,
    /// Wall-clock start of the recording, if known
    pub recorded_at: Option<DateTime<Utc>>,
}

impl StreamMeta {
    /// Frame rate to sample at, falling back to [`DEFAULT_FPS`]
    pub fn sampling_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            DEFAULT_FPS
        }
    }

    /// Stream length, derived from the frame count when not reported
    pub fn known_duration(&self) -> Option<f64> {
        match self.duration {
            Some(d) if d > 0.0 => Some(d),
            _ if self.frame_count > 0 && self.fps.is_finite() && self.fps > 0.0 => {
                Some(self.frame_count as f64 / self.fps)
            }
            _ => None,
        }
    }
}

/// A decoded frame and its time on the stream timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFrame<F> {
    pub time: f64,
    pub frame: F,
}

/// Supplies time-ordered frames for a window
pub trait FrameSource {
    type Frame;

    fn meta(&self) -> StreamMeta;

    /// Frames whose time falls within `bounds`, in time order, sampled at
    /// roughly `fps` frames per second
    fn frames(
        &mut self,
        bounds: &WindowBounds,
        fps: f64,
    ) -> Result<Vec<TimedFrame<Self::Frame>>, AnalysisError>;
}

/// Face landmark detection for one frame
pub trait LandmarkProvider<F> {
    /// Landmarks for the most prominent face, `None` when no face is found
    fn detect(&mut self, frame: &F) -> Option<LandmarkFrame>;
}

/// Provider for frames that already carry their detection result
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedLandmarks;

impl LandmarkProvider<Option<LandmarkFrame>> for PrecomputedLandmarks {
    fn detect(&mut self, frame: &Option<LandmarkFrame>) -> Option<LandmarkFrame> {
        frame.clone()
    }
}

/// Landmark detection result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedFrame {
    pub time: f64,
    #[serde(default)]
    pub landmarks: Option<LandmarkFrame>,
}

/// A window summary stamped with its wall-clock end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedWindow {
    pub ts_end: DateTime<Utc>,
    pub bounds: WindowBounds,
    pub summary: WindowSummary,
}

/// Computes window summaries from landmark frames
#[derive(Debug, Clone)]
pub struct WindowAnalyzer {
    config: AnalyzerConfig,
}

impl WindowAnalyzer {
    /// Create an analyzer with a validated configuration
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Summarize landmark frames for one window
    ///
    /// Fails with [`AnalysisError::NoFrames`] when `frames` is empty.
    pub fn analyze<'a, I>(
        &self,
        frames: I,
        size: FrameSize,
        bounds: WindowBounds,
    ) -> Result<WindowSummary, AnalysisError>
    where
        I: IntoIterator<Item = &'a ObservedFrame>,
    {
        let layout = &self.config.layout;
        let mut builder = SampleBuilder::new(bounds, self.config.confidence_threshold);
        for frame in frames {
            let measurement = frame.landmarks.as_ref().map(|lm| measure(lm, size, layout));
            builder.push(frame.time, measurement);
        }

        if builder.frame_count() == 0 {
            warn!(
                "No frames for window [{:.2}s, {:.2}s]",
                bounds.start, bounds.end
            );
            return Err(AnalysisError::NoFrames {
                start: bounds.start,
                end: bounds.end,
            });
        }

        let (samples, stats) = builder.finish();
        let summary = summarize(&samples, &stats, &bounds, &self.config);
        debug!(
            "Window [{:.2}s, {:.2}s]: {} frames ({} detected, {} interpolated), EAR T={:.3} ({:?} pool), PERCLOS {:.1}%",
            bounds.start,
            bounds.end,
            stats.total_frames,
            stats.detected_frames,
            stats.interpolated_samples,
            summary.ear_threshold,
            summary.ear_pool,
            summary.perclos_percent,
        );
        Ok(summary)
    }

    /// Resolve the window ending at `timestamp`, pull its frames and analyze them
    pub fn analyze_window<S, P>(
        &self,
        source: &mut S,
        provider: &mut P,
        timestamp: f64,
    ) -> Result<AnalyzedWindow, AnalysisError>
    where
        S: FrameSource,
        P: LandmarkProvider<S::Frame>,
    {
        let meta = source.meta();
        let bounds = WindowBounds::resolve(
            timestamp,
            meta.known_duration(),
            self.config.window_seconds,
            self.config.min_window_seconds,
        )?;
        let ts_end = resolve_window_end(meta.recorded_at, timestamp)?;

        let observed: Vec<ObservedFrame> = source
            .frames(&bounds, meta.sampling_fps())?
            .into_iter()
            .map(|f| ObservedFrame {
                time: f.time,
                landmarks: provider.detect(&f.frame),
            })
            .collect();

        let summary = self.analyze(&observed, meta.size, bounds)?;
        Ok(AnalyzedWindow {
            ts_end,
            bounds,
            summary,
        })
    }
}

/// Nominal frame times for a window at `fps`, starting at the window start
pub fn frame_times(bounds: &WindowBounds, fps: f64) -> Vec<f64> {
    let fps = if fps > 0.0 { fps } else { DEFAULT_FPS };
    let mut times = Vec::new();
    let mut index = 0usize;
    loop {
        let t = bounds.start + index as f64 / fps;
        if t > bounds.end {
            break;
        }
        times.push(t);
        index += 1;
    }
    times
}
