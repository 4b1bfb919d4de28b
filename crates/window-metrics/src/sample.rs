//! Per-frame samples and the sequence builder

use face_geometry::FrameMeasurement;
use serde::{Deserialize, Serialize};

use crate::window::WindowBounds;

/// Confidence given to a sample whose EAR was filled from its neighbours
const INTERPOLATED_MIN_CONFIDENCE: f64 = 0.4;
/// Decay applied when only one neighbour is available
const ONE_SIDED_DECAY: f64 = 0.95;

/// One analyzed frame on the window's timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds on the stream timeline, clamped into the window
    pub time: f64,
    /// Mean eye aspect ratio of both eyes, `None` when not measurable
    pub ear: Option<f64>,
    /// Mouth aspect ratio
    pub mar: Option<f64>,
    /// Head pitch below level, degrees
    pub pitch_down_deg: Option<f64>,
    /// Landmark tracking confidence in [0, 1], 0 without a face
    pub confidence: f64,
    pub has_face: bool,
}

impl Sample {
    /// Sample for a frame with a detected face
    pub fn detected(time: f64, measurement: FrameMeasurement) -> Self {
        Self {
            time,
            ear: measurement.ear,
            mar: measurement.mar,
            pitch_down_deg: measurement.pitch_down_deg,
            confidence: measurement.confidence,
            has_face: true,
        }
    }

    /// Sample for a frame where no face was found
    pub fn no_face(time: f64) -> Self {
        Self {
            time,
            ear: None,
            mar: None,
            pitch_down_deg: None,
            confidence: 0.0,
            has_face: false,
        }
    }

    /// Copy of this sample moved to another time
    pub fn at(&self, time: f64) -> Self {
        Self { time, ..*self }
    }

    /// Face present with confidence at or above `threshold`
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.has_face && self.confidence >= threshold
    }
}

/// Frame counters gathered while building a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Frames pushed, with or without a face
    pub total_frames: usize,
    /// Frames with a detected face
    pub detected_frames: usize,
    /// Detected frames at or above the confidence threshold
    pub high_conf_frames: usize,
    /// Samples whose EAR was filled by interpolation
    pub interpolated_samples: usize,
}

/// Accumulates samples for one window
#[derive(Debug)]
pub struct SampleBuilder {
    bounds: WindowBounds,
    confidence_threshold: f64,
    samples: Vec<Sample>,
    stats: RunStats,
}

impl SampleBuilder {
    pub fn new(bounds: WindowBounds, confidence_threshold: f64) -> Self {
        Self {
            bounds,
            confidence_threshold,
            samples: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Record one frame; `None` means no face was detected
    pub fn push(&mut self, time: f64, measurement: Option<FrameMeasurement>) {
        let time = self.bounds.clamp(time);
        self.stats.total_frames += 1;

        let sample = match measurement {
            Some(m) => {
                self.stats.detected_frames += 1;
                if m.confidence >= self.confidence_threshold {
                    self.stats.high_conf_frames += 1;
                }
                Sample::detected(time, m)
            }
            None => Sample::no_face(time),
        };
        self.samples.push(sample);
    }

    pub fn frame_count(&self) -> usize {
        self.stats.total_frames
    }

    /// Pad the boundaries and fill EAR gaps
    pub fn finish(self) -> (Vec<Sample>, RunStats) {
        let mut stats = self.stats;
        let padded = pad_boundaries(self.samples, &self.bounds);
        let (samples, filled) = interpolate_missing_ear(&padded);
        stats.interpolated_samples = filled;
        (samples, stats)
    }
}

/// Ensure samples exist exactly at the window start and end
///
/// The first and last samples are duplicated onto the boundaries when they do
/// not already sit there.
pub fn pad_boundaries(mut samples: Vec<Sample>, bounds: &WindowBounds) -> Vec<Sample> {
    if let Some(head) = samples.first().copied() {
        if head.time > bounds.start {
            samples.insert(0, head.at(bounds.start));
        }
    }
    if let Some(tail) = samples.last().copied() {
        if tail.time < bounds.end {
            samples.push(tail.at(bounds.end));
        }
    }
    samples
}

/// Fill missing EAR values on face-present samples from their neighbours
///
/// Neighbours are searched in the input sequence, so filled values never feed
/// other fills. Returns the new sequence and the number of samples filled.
/// Sequences shorter than three samples are returned unchanged.
pub fn interpolate_missing_ear(samples: &[Sample]) -> (Vec<Sample>, usize) {
    if samples.len() < 3 {
        return (samples.to_vec(), 0);
    }

    let usable = |s: &&Sample| s.has_face && s.ear.is_some();
    let mut filled = 0;

    let out = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            if sample.ear.is_some() || !sample.has_face {
                return *sample;
            }

            let prev = samples[..i].iter().rev().find(usable).and_then(|s| s.ear);
            let next = samples[i + 1..].iter().find(usable).and_then(|s| s.ear);
            let ear = match (prev, next) {
                (Some(p), Some(n)) => Some((p + n) / 2.0),
                (Some(v), None) | (None, Some(v)) => Some(v * ONE_SIDED_DECAY),
                (None, None) => None,
            };

            match ear {
                Some(ear) => {
                    filled += 1;
                    Sample {
                        ear: Some(ear),
                        confidence: sample.confidence.max(INTERPOLATED_MIN_CONFIDENCE),
                        ..*sample
                    }
                }
                None => *sample,
            }
        })
        .collect();

    (out, filled)
}
