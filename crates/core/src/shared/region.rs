use serde::Serialize;

/// Axis-aligned detection rectangle in pixel coordinates of the frame it
/// was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() as f64 + other.area() as f64 - inter;
        inter / union
    }

    /// Maps the region into a frame resized by `factor`, rounding each edge.
    ///
    /// Use `1.0 / factor` to bring detections on a resized frame back to
    /// the original frame.
    pub fn scaled(&self, factor: f64) -> Region {
        let x = (self.x as f64 * factor).round() as i32;
        let y = (self.y as f64 * factor).round() as i32;
        let right = (self.right() as f64 * factor).round() as i32;
        let bottom = (self.bottom() as f64 * factor).round() as i32;
        Region::new(x, y, right - x, bottom - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical_regions() {
        let a = Region::new(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Region::new(0, 0, 50, 50);
        let b = Region::new(100, 100, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection: [50,0]-[100,100] = 5000, union: 15000
        let a = Region::new(0, 0, 100, 100);
        let b = Region::new(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_contained() {
        let a = Region::new(0, 0, 100, 100);
        let b = Region::new(25, 25, 50, 50);
        assert_relative_eq!(a.iou(&b), 2500.0 / 10000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = Region::new(0, 0, 50, 50);
        let b = Region::new(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[rstest]
    #[case::zero_width(Region::new(0, 0, 0, 100), Region::new(0, 0, 50, 50), 0.0)]
    #[case::zero_height(Region::new(0, 0, 100, 0), Region::new(0, 0, 50, 50), 0.0)]
    fn test_iou_degenerate(#[case] a: Region, #[case] b: Region, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected);
    }

    // ── Scaling ──────────────────────────────────────────────────────

    #[test]
    fn test_scaled_up() {
        let r = Region::new(300, 150, 120, 40).scaled(1.05);
        assert_eq!(r, Region::new(315, 158, 126, 42));
    }

    #[test]
    fn test_scaled_roundtrip_is_close() {
        let original = Region::new(300, 150, 120, 40);
        let back = original.scaled(1.05).scaled(1.0 / 1.05);
        assert!(back.iou(&original) > 0.95);
    }

    #[test]
    fn test_right_and_bottom() {
        let r = Region::new(5, 7, 10, 20);
        assert_eq!(r.right(), 15);
        assert_eq!(r.bottom(), 27);
        assert_eq!(r.area(), 200);
    }
}
