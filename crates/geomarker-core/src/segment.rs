use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Pixel-space line segment as emitted by a line detector.
///
/// Endpoints are integer pixel positions. Direction carries no meaning for
/// intersection or proximity tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn start(&self) -> Point2<f64> {
        Point2::new(self.x1 as f64, self.y1 as f64)
    }

    pub fn end(&self) -> Point2<f64> {
        Point2::new(self.x2 as f64, self.y2 as f64)
    }

    pub fn length(&self) -> f64 {
        (self.end() - self.start()).norm()
    }

    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.start(), &self.end())
    }

    /// Smallest of the four endpoint-to-endpoint distances.
    pub fn endpoint_distance(&self, other: &LineSegment) -> f64 {
        let [a0, a1] = [self.start(), self.end()];
        let [b0, b1] = [other.start(), other.end()];
        [
            nalgebra::distance(&a0, &b0),
            nalgebra::distance(&a0, &b1),
            nalgebra::distance(&a1, &b0),
            nalgebra::distance(&a1, &b1),
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }

    /// `true` when some endpoint pair is strictly closer than `max_dist`.
    pub fn is_near(&self, other: &LineSegment, max_dist: f64) -> bool {
        self.endpoint_distance(other) < max_dist
    }
}

/// Intersection of the infinite lines through `a` and `b`.
///
/// Returns `None` when the determinant is zero: parallel or collinear
/// lines, or a zero-length segment.
pub fn line_intersection(a: &LineSegment, b: &LineSegment) -> Option<Point2<f64>> {
    let (x1, y1, x2, y2) = (a.x1 as f64, a.y1 as f64, a.x2 as f64, a.y2 as f64);
    let (x3, y3, x4, y4) = (b.x1 as f64, b.y1 as f64, b.x2 as f64, b.y2 as f64);

    // Integer inputs keep the determinant exact, so a zero test is sound.
    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom == 0.0 {
        return None;
    }

    let cross_a = x1 * y2 - y1 * x2;
    let cross_b = x3 * y4 - y3 * x4;
    let px = (cross_a * (x3 - x4) - (x1 - x2) * cross_b) / denom;
    let py = (cross_a * (y3 - y4) - (y1 - y2) * cross_b) / denom;
    Some(Point2::new(px, py))
}
