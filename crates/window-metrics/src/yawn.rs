//! Yawn event detection
//!
//! Hysteresis state machine over the MAR signal. A yawn starts once MAR has
//! stayed above threshold on confident samples for `start_hold` seconds, and
//! ends once it has stayed below for `end_hold`. An open mouth on a
//! low-confidence sample keeps an event alive, and a confident frame without
//! a mouth measurement does not start the end timer.

use serde::{Deserialize, Serialize};

use crate::config::YawnConfig;
use crate::sample::Sample;
use crate::window::WindowBounds;

/// One detected yawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YawnEvent {
    pub start: f64,
    pub end: f64,
    pub peak_mar: f64,
}

impl YawnEvent {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Inactive {
        candidate_start: Option<f64>,
    },
    Active {
        start: f64,
        peak: f64,
        end_candidate: Option<f64>,
    },
}

/// Streaming yawn detector for one window
#[derive(Debug, Clone)]
pub struct YawnDetector {
    config: YawnConfig,
    mar_threshold: f64,
    confidence_threshold: f64,
    phase: Phase,
    last_end: f64,
    events: Vec<YawnEvent>,
}

impl YawnDetector {
    pub fn new(config: YawnConfig, mar_threshold: f64, confidence_threshold: f64) -> Self {
        Self {
            config,
            mar_threshold,
            confidence_threshold,
            phase: Phase::Inactive {
                candidate_start: None,
            },
            last_end: f64::NEG_INFINITY,
            events: Vec::new(),
        }
    }

    /// Feed the next sample (time already clamped to the window)
    pub fn observe(&mut self, t: f64, sample: &Sample, window_end: f64) {
        let above = sample.mar.map_or(false, |m| m > self.mar_threshold);
        let confident = sample.is_confident(self.confidence_threshold);
        let can_start = above && confident;
        let can_end = sample.mar.is_some() || !confident;

        self.phase = match self.phase {
            Phase::Inactive { candidate_start } => {
                if can_start && t - self.last_end >= self.config.refractory {
                    let candidate = candidate_start.unwrap_or(t);
                    match sample.mar {
                        Some(mar) if t - candidate >= self.config.start_hold => Phase::Active {
                            start: candidate,
                            peak: mar,
                            end_candidate: None,
                        },
                        _ => Phase::Inactive {
                            candidate_start: Some(candidate),
                        },
                    }
                } else if !above {
                    Phase::Inactive {
                        candidate_start: None,
                    }
                } else {
                    Phase::Inactive { candidate_start }
                }
            }
            Phase::Active {
                start,
                peak,
                end_candidate,
            } => match sample.mar {
                Some(mar) if above => Phase::Active {
                    start,
                    peak: peak.max(mar),
                    end_candidate: None,
                },
                _ if can_end => {
                    let end_at = end_candidate.unwrap_or(t);
                    if t - end_at >= self.config.end_hold {
                        let end = window_end.min(t);
                        self.events.push(YawnEvent {
                            start,
                            end,
                            peak_mar: peak,
                        });
                        self.last_end = end;
                        Phase::Inactive {
                            candidate_start: None,
                        }
                    } else {
                        Phase::Active {
                            start,
                            peak,
                            end_candidate: Some(end_at),
                        }
                    }
                }
                _ => Phase::Active {
                    start,
                    peak,
                    end_candidate,
                },
            },
        };
    }

    /// Close any open event at the window end and return all events
    pub fn finish(mut self, window_end: f64) -> Vec<YawnEvent> {
        if let Phase::Active { start, peak, .. } = self.phase {
            self.events.push(YawnEvent {
                start,
                end: window_end,
                peak_mar: peak,
            });
        }
        self.events
    }
}

/// Run the detector over a window's samples
pub fn detect_yawns(
    samples: &[Sample],
    bounds: &WindowBounds,
    mar_threshold: f64,
    confidence_threshold: f64,
    config: YawnConfig,
) -> Vec<YawnEvent> {
    let mut detector = YawnDetector::new(config, mar_threshold, confidence_threshold);
    for sample in samples {
        detector.observe(bounds.clamp(sample.time), sample, bounds.end);
    }
    detector.finish(bounds.end)
}
