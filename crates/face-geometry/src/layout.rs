//! Landmark layout configuration

use serde::{Deserialize, Serialize};

/// Six landmarks describing one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices {
    pub outer_corner: usize,
    pub inner_corner: usize,
    pub upper1: usize,
    pub lower1: usize,
    pub upper2: usize,
    pub lower2: usize,
}

impl EyeIndices {
    pub const fn new(
        outer_corner: usize,
        inner_corner: usize,
        upper1: usize,
        lower1: usize,
        upper2: usize,
        lower2: usize,
    ) -> Self {
        Self {
            outer_corner,
            inner_corner,
            upper1,
            lower1,
            upper2,
            lower2,
        }
    }
}

/// A landmark index paired with its position on the 3-D face template
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosePoint {
    pub index: usize,
    pub model: [f64; 3],
}

/// Which landmark indices feed each measurement
///
/// Defaults follow the refined 478-point face mesh (468 surface points plus
/// 10 iris points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkLayout {
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,

    /// Upper/lower lip pairs for the mouth opening
    pub mouth_pairs: Vec<(usize, usize)>,
    /// Left and right mouth corners
    pub mouth_corners: (usize, usize),

    /// Iris points; all must be present for the iris to count as visible
    pub iris: Vec<usize>,
    /// Upper/lower eyelid pair used for the lid spread
    pub lid_pair: (usize, usize),
    pub nose_bridge: (usize, usize),
    pub forehead: (usize, usize),
    pub chin: (usize, usize),

    /// Forehead-top and chin-bottom points for the coarse pitch estimate
    pub pitch_axis: (usize, usize),

    /// 2-D/3-D correspondences for the perspective-n-point solve
    pub pose_template: Vec<PosePoint>,
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self {
            left_eye: EyeIndices::new(33, 133, 160, 144, 158, 153),
            right_eye: EyeIndices::new(263, 362, 387, 373, 385, 380),
            mouth_pairs: vec![(13, 14), (82, 87), (312, 402)],
            mouth_corners: (61, 291),
            iris: vec![468, 469, 470, 471, 472, 473],
            lid_pair: (159, 145),
            nose_bridge: (6, 9),
            forehead: (10, 151),
            chin: (152, 175),
            pitch_axis: (10, 152),
            pose_template: vec![
                PosePoint { index: 1, model: [0.0, 0.0, 0.0] },
                PosePoint { index: 152, model: [0.0, -63.6, -12.5] },
                PosePoint { index: 33, model: [-43.3, 32.7, -26.0] },
                PosePoint { index: 263, model: [43.3, 32.7, -26.0] },
                PosePoint { index: 61, model: [-28.9, -28.9, -24.1] },
                PosePoint { index: 291, model: [28.9, -28.9, -24.1] },
            ],
        }
    }
}
