use serde::{Deserialize, Serialize};

/// Axis-aligned box in source frame pixels, top-left anchored.
///
/// Serialized as the detector wire array `[x, y, width, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
    }

    /// Component-wise convex combination:
    /// `previous * weight_previous + latest * (1 - weight_previous)`.
    ///
    /// `weight_previous` is clamped to `[0, 1]` so the result never leaves
    /// the range spanned by the two inputs.
    pub fn blend(previous: &BoundingBox, latest: &BoundingBox, weight_previous: f64) -> BoundingBox {
        let w = weight_previous.clamp(0.0, 1.0);
        let mix = |p: f64, l: f64| p * w + l * (1.0 - w);
        BoundingBox {
            x: mix(previous.x, latest.x),
            y: mix(previous.y, latest.y),
            width: mix(previous.width, latest.width),
            height: mix(previous.height, latest.height),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_center() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.center(), (60.0, 45.0));
    }

    #[test]
    fn test_center_distance_is_symmetric() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(30.0, 40.0, 10.0, 10.0);
        assert_relative_eq!(a.center_distance(&b), 50.0);
        assert_relative_eq!(b.center_distance(&a), 50.0);
    }

    #[test]
    fn test_center_distance_ignores_size_change_around_same_center() {
        let a = BoundingBox::new(40.0, 40.0, 20.0, 20.0);
        let b = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_relative_eq!(a.center_distance(&b), 0.0);
    }

    #[rstest]
    #[case::all_previous(1.0, [0.0, 0.0, 10.0, 10.0])]
    #[case::all_latest(0.0, [100.0, 100.0, 20.0, 20.0])]
    #[case::midpoint(0.5, [50.0, 50.0, 15.0, 15.0])]
    #[case::clamped_above(3.0, [0.0, 0.0, 10.0, 10.0])]
    #[case::clamped_below(-1.0, [100.0, 100.0, 20.0, 20.0])]
    fn test_blend(#[case] weight: f64, #[case] expected: [f64; 4]) {
        let prev = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let latest = BoundingBox::new(100.0, 100.0, 20.0, 20.0);
        let out: [f64; 4] = BoundingBox::blend(&prev, &latest, weight).into();
        for i in 0..4 {
            assert_relative_eq!(out[i], expected[i]);
        }
    }

    #[test]
    fn test_serializes_as_wire_array() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str("[10, 10, 100, 100]").unwrap();
        assert_eq!(back, BoundingBox::new(10.0, 10.0, 100.0, 100.0));
    }
}
