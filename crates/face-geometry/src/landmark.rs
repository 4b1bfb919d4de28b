//! Landmark frame types

use serde::{Deserialize, Serialize};

/// One normalized keypoint (x, y in [0, 1] of the image; z is relative depth)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance over (x, y, z)
    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Pixel dimensions of the source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Indexed landmark set for one video frame
///
/// Slots may be empty when the provider did not report a point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Option<Landmark>>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Option<Landmark>>) -> Self {
        Self { points }
    }

    /// Build a frame where every slot is present
    pub fn from_points(points: impl IntoIterator<Item = Landmark>) -> Self {
        Self {
            points: points.into_iter().map(Some).collect(),
        }
    }

    /// Landmark at `idx`, if reported
    pub fn get(&self, idx: usize) -> Option<&Landmark> {
        self.points.get(idx).and_then(Option::as_ref)
    }

    pub fn has(&self, idx: usize) -> bool {
        self.get(idx).is_some()
    }

    /// Whether every index in `indices` is present
    pub fn has_all(&self, indices: &[usize]) -> bool {
        indices.iter().all(|&idx| self.has(idx))
    }

    /// Distance between two landmarks, `None` if either is absent
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        Some(self.get(a)?.distance(self.get(b)?))
    }

    /// Overwrite or clear one slot, growing the frame if needed
    pub fn set(&mut self, idx: usize, point: Option<Landmark>) {
        if idx >= self.points.len() {
            self.points.resize(idx + 1, None);
        }
        self.points[idx] = point;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_three_dimensional() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(3.0, 4.0, 12.0);
        assert!((a.distance(&b) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_slots() {
        let mut frame = LandmarkFrame::new(vec![Some(Landmark::default()), None]);
        assert!(frame.has(0));
        assert!(!frame.has(1));
        assert!(!frame.has(7));
        assert_eq!(frame.distance(0, 1), None);

        frame.set(5, Some(Landmark::new(1.0, 0.0, 0.0)));
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.distance(0, 5), Some(1.0));
    }

    #[test]
    fn test_serializes_as_point_list() {
        let frame = LandmarkFrame::new(vec![Some(Landmark::new(0.5, 0.25, 0.0)), None]);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"[{"x":0.5,"y":0.25,"z":0.0},null]"#);

        let parsed: LandmarkFrame = serde_json::from_str(r#"[{"x":0.1,"y":0.2},null]"#).unwrap();
        assert_eq!(parsed.get(0), Some(&Landmark::new(0.1, 0.2, 0.0)));
        assert!(!parsed.has(1));
    }
}
