//! Facial Landmark Geometry
//!
//! Pure per-frame signal extraction from a face-mesh landmark set:
//! - Eye aspect ratio (EAR)
//! - Mouth aspect ratio (MAR)
//! - Head pitch-down angle (perspective-n-point, with a coarse fallback)
//! - Detection confidence heuristic
//!
//! Every function here is deterministic in the landmark coordinates; nothing
//! keeps state between frames.

pub mod confidence;
pub mod eye;
pub mod landmark;
pub mod layout;
pub mod mouth;
pub mod pose;

pub use confidence::detection_confidence;
pub use eye::eye_aspect_ratio;
pub use landmark::{FrameSize, Landmark, LandmarkFrame};
pub use layout::{EyeIndices, LandmarkLayout, PosePoint};
pub use mouth::mouth_aspect_ratio;
pub use pose::{pitch_down_deg, solve_head_pose, EulerAngles};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Head pose solve failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("Pose correspondence incomplete: {missing} template landmark(s) absent")]
    IncompleteCorrespondence { missing: usize },

    #[error("Pose system is degenerate")]
    Degenerate,

    #[error("Pose refinement did not converge")]
    NotConverged,
}

/// Signals measured from a single frame
///
/// Each signal is independently optional: a frame may yield a usable EAR
/// while the mouth is occluded, and so on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMeasurement {
    pub ear: Option<f64>,
    pub mar: Option<f64>,
    pub pitch_down_deg: Option<f64>,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
}

/// Measure every signal for one detected face
pub fn measure(frame: &LandmarkFrame, size: FrameSize, layout: &LandmarkLayout) -> FrameMeasurement {
    FrameMeasurement {
        ear: eye_aspect_ratio(frame, layout),
        mar: mouth_aspect_ratio(frame, layout),
        pitch_down_deg: pitch_down_deg(frame, size, layout),
        confidence: detection_confidence(frame, layout),
    }
}
