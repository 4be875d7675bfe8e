//! Planar polygon helpers used by the validators.
//!
//! All functions take vertices in order (either winding) and treat the
//! polygon as closed.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Shoelace area, positive for counter-clockwise vertices in a y-up frame.
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = cyclic_pairs(points)
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    0.5 * twice
}

pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    signed_area(points).abs()
}

/// Length of the outline; `closed` adds the last-to-first edge.
pub fn perimeter(points: &[Point2<f64>], closed: bool) -> f64 {
    let open: f64 = points
        .windows(2)
        .map(|w| nalgebra::distance(&w[0], &w[1]))
        .sum();
    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => {
            open + nalgebra::distance(last, first)
        }
        _ => open,
    }
}

/// Distances between cyclically adjacent vertices.
pub fn side_lengths(points: &[Point2<f64>]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }
    cyclic_pairs(points)
        .map(|(a, b)| nalgebra::distance(a, b))
        .collect()
}

/// Convex hull by Andrew's monotone chain, counter-clockwise, without
/// collinear points.
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(2 * pts.len());
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

/// `true` when every turn has the same orientation.
///
/// Collinear triples are ignored; fewer than three vertices is not convex.
pub fn is_convex(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let c = cross(&points[i], &points[(i + 1) % n], &points[(i + 2) % n]);
        if c == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Centroid from the polygon's zeroth and first order moments.
///
/// Returns `None` for a polygon with zero area.
pub fn polygon_centroid(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    if points.len() < 3 {
        return None;
    }
    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    for (a, b) in cyclic_pairs(points) {
        let c = a.x * b.y - b.x * a.y;
        m00 += c;
        m10 += (a.x + b.x) * c;
        m01 += (a.y + b.y) * c;
    }
    // m00 is twice the signed area here; the factors cancel below.
    if m00.abs() <= f64::EPSILON {
        return None;
    }
    Some(Point2::new(m10 / (3.0 * m00), m01 / (3.0 * m00)))
}

/// Axis-aligned bounds of a point set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

pub fn bounding_box(points: &[Point2<f64>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bb = BoundingBox {
        min: *first,
        max: *first,
    };
    for p in &points[1..] {
        bb.min.x = bb.min.x.min(p.x);
        bb.min.y = bb.min.y.min(p.y);
        bb.max.x = bb.max.x.max(p.x);
        bb.max.y = bb.max.y.max(p.y);
    }
    Some(bb)
}

fn cyclic_pairs(points: &[Point2<f64>]) -> impl Iterator<Item = (&Point2<f64>, &Point2<f64>)> {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .take(points.len())
}

fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}
