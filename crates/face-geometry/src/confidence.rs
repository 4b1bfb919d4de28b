//! Detection confidence heuristic

use crate::landmark::LandmarkFrame;
use crate::layout::LandmarkLayout;

/// Lid spread scale when the iris is tracked
const IRIS_SPREAD_SCALE: f64 = 120.0;
/// Offset added when the iris is tracked
const IRIS_BASE: f64 = 0.4;
/// Lid spread scale without iris tracking
const BARE_SPREAD_SCALE: f64 = 80.0;
/// Boost applied when the nose bridge is visible but the iris is not (glasses)
const GLASSES_BOOST: f64 = 1.3;
/// Score floor for partial faces with open lids
const PARTIAL_FACE_FLOOR: f64 = 0.45;
/// Minimum lid spread for the partial-face floor to apply
const PARTIAL_FACE_MIN_SPREAD: f64 = 0.005;

/// Heuristic tracking confidence in [0, 1]
///
/// Base score comes from the vertical eyelid spread, scaled higher when the
/// iris points are tracked. Frames that show the nose bridge but no iris get
/// a 30% boost since glasses commonly hide the iris. Frames showing the
/// forehead or chin with open lids never drop below 0.45.
pub fn detection_confidence(frame: &LandmarkFrame, layout: &LandmarkLayout) -> f64 {
    let iris_visible = frame.has_all(&layout.iris);

    let (upper, lower) = layout.lid_pair;
    let lid_spread = match (frame.get(upper), frame.get(lower)) {
        (Some(a), Some(b)) => (a.y - b.y).abs(),
        _ => 0.0,
    };

    let mut score = if iris_visible {
        IRIS_BASE + lid_spread * IRIS_SPREAD_SCALE
    } else {
        lid_spread * BARE_SPREAD_SCALE
    };

    let nose_bridge_visible = frame.has(layout.nose_bridge.0) && frame.has(layout.nose_bridge.1);
    if nose_bridge_visible && !iris_visible {
        score *= GLASSES_BOOST;
    }

    let forehead_visible = frame.has(layout.forehead.0) && frame.has(layout.forehead.1);
    let chin_visible = frame.has(layout.chin.0) && frame.has(layout.chin.1);
    if (forehead_visible || chin_visible) && lid_spread > PARTIAL_FACE_MIN_SPREAD {
        score = score.max(PARTIAL_FACE_FLOOR);
    }

    score.clamp(0.0, 1.0)
}
