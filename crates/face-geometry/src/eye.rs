//! Eye aspect ratio

use crate::landmark::LandmarkFrame;
use crate::layout::{EyeIndices, LandmarkLayout};

/// Mean EAR of both eyes
///
/// `None` when either eye cannot be measured.
pub fn eye_aspect_ratio(frame: &LandmarkFrame, layout: &LandmarkLayout) -> Option<f64> {
    let left = single_eye_ratio(frame, &layout.left_eye)?;
    let right = single_eye_ratio(frame, &layout.right_eye)?;
    Some((left + right) / 2.0)
}

/// EAR = (|upper1 - lower1| + |upper2 - lower2|) / (2 * |outer - inner|)
pub fn single_eye_ratio(frame: &LandmarkFrame, eye: &EyeIndices) -> Option<f64> {
    let horizontal = frame.distance(eye.outer_corner, eye.inner_corner)?;
    let vertical1 = frame.distance(eye.upper1, eye.lower1)?;
    let vertical2 = frame.distance(eye.upper2, eye.lower2)?;

    if horizontal == 0.0 {
        return None;
    }
    Some((vertical1 + vertical2) / (2.0 * horizontal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn eye_frame(eye: &EyeIndices, width: f64, opening: f64) -> LandmarkFrame {
        let mut frame = LandmarkFrame::default();
        frame.set(eye.outer_corner, Some(Landmark::new(0.0, 0.0, 0.0)));
        frame.set(eye.inner_corner, Some(Landmark::new(width, 0.0, 0.0)));
        frame.set(eye.upper1, Some(Landmark::new(width * 0.33, -opening / 2.0, 0.0)));
        frame.set(eye.lower1, Some(Landmark::new(width * 0.33, opening / 2.0, 0.0)));
        frame.set(eye.upper2, Some(Landmark::new(width * 0.66, -opening / 2.0, 0.0)));
        frame.set(eye.lower2, Some(Landmark::new(width * 0.66, opening / 2.0, 0.0)));
        frame
    }

    #[test]
    fn test_single_eye_ratio() {
        let layout = LandmarkLayout::default();
        let frame = eye_frame(&layout.left_eye, 0.1, 0.03);
        let ear = single_eye_ratio(&frame, &layout.left_eye).unwrap();
        assert!((ear - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_zero_width_is_none() {
        let layout = LandmarkLayout::default();
        let frame = eye_frame(&layout.left_eye, 0.0, 0.03);
        assert_eq!(single_eye_ratio(&frame, &layout.left_eye), None);
    }

    #[test]
    fn test_missing_lid_is_none() {
        let layout = LandmarkLayout::default();
        let mut frame = eye_frame(&layout.left_eye, 0.1, 0.03);
        frame.set(layout.left_eye.lower2, None);
        assert_eq!(single_eye_ratio(&frame, &layout.left_eye), None);
    }

    #[test]
    fn test_both_eyes_averaged() {
        let layout = LandmarkLayout::default();
        let mut frame = eye_frame(&layout.left_eye, 0.1, 0.02);
        let right = eye_frame(&layout.right_eye, 0.1, 0.04);
        for idx in [
            layout.right_eye.outer_corner,
            layout.right_eye.inner_corner,
            layout.right_eye.upper1,
            layout.right_eye.lower1,
            layout.right_eye.upper2,
            layout.right_eye.lower2,
        ] {
            frame.set(idx, right.get(idx).copied());
        }

        let ear = eye_aspect_ratio(&frame, &layout).unwrap();
        assert!((ear - 0.3).abs() < 1e-9);
    }
}
