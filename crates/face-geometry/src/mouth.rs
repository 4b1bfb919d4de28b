//! Mouth aspect ratio

use crate::landmark::LandmarkFrame;
use crate::layout::LandmarkLayout;

/// Mean vertical lip gap divided by mouth width
///
/// Lip pairs that are absent or fully closed (zero gap) are skipped; `None`
/// when the mouth width is zero or no gap remains.
pub fn mouth_aspect_ratio(frame: &LandmarkFrame, layout: &LandmarkLayout) -> Option<f64> {
    let (left, right) = layout.mouth_corners;
    let width = frame.distance(left, right)?;
    if width == 0.0 {
        return None;
    }

    let gaps: Vec<f64> = layout
        .mouth_pairs
        .iter()
        .filter_map(|&(upper, lower)| frame.distance(upper, lower))
        .filter(|&gap| gap > 0.0)
        .collect();

    if gaps.is_empty() {
        return None;
    }
    let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
    Some(mean_gap / width)
}
