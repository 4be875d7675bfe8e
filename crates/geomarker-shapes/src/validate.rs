//! Line-based polygon validation.
//!
//! A candidate of `k` segments is a `k`-gon if, taken in cyclic order:
//! 1. the required segment pairs have nearby endpoints,
//! 2. each adjacent pair of infinite lines intersects,
//! 3. the `k` intersection points are pairwise distinct,
//! 4. no side (distance between adjacent intersections) is degenerate,
//! 5. side lengths agree within a relative tolerance.

use geomarker_core::{line_intersection, side_lengths, LineSegment, ShapeKind};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::combos::{CandidateSearch, SearchStats};

/// Two intersection points closer than this are the same vertex.
const VERTEX_EPS: f64 = 1e-9;

/// Which segment pairs of a candidate must have nearby endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityRule {
    /// Every pair in the candidate.
    AllPairs,
    /// Only cyclically adjacent pairs.
    CyclicNeighbors,
}

/// How the pixel centroid of an accepted line polygon is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidMode {
    /// Mean of the vertex (intersection) points.
    Vertices,
    /// Mean of the segment midpoints.
    SegmentMidpoints,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineValidatorParams {
    /// Endpoint distance below which two segments are considered touching.
    pub endpoint_proximity_px: f64,
    pub proximity: ProximityRule,
    /// Sort segments by midpoint angle around their common centre before the
    /// cyclic tests. When off, the input order is the cyclic order.
    pub order_cyclically: bool,
    /// Sides must be strictly longer than this.
    pub min_side_px: f64,
    /// Accept when `(max_side - min_side) < tolerance * max_side`.
    pub tolerance: f64,
    pub centroid: CentroidMode,
    /// Only the longest `max_lines` segments of a frame are searched.
    pub max_lines: usize,
    /// Upper bound on evaluated candidates per frame and target.
    pub max_candidates: usize,
}

impl LineValidatorParams {
    pub fn for_shape(shape: ShapeKind) -> Self {
        let (proximity, tolerance) = match shape {
            ShapeKind::Triangle => (ProximityRule::AllPairs, 0.4),
            ShapeKind::Hexagon => (ProximityRule::CyclicNeighbors, 0.5),
        };
        Self {
            endpoint_proximity_px: 40.0,
            proximity,
            order_cyclically: true,
            min_side_px: 10.0,
            tolerance,
            centroid: CentroidMode::Vertices,
            max_lines: 32,
            max_candidates: 200_000,
        }
    }
}

/// Reason a candidate was turned down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    WrongSegmentCount,
    NotProximate,
    Parallel,
    CoincidentVertices,
    DegenerateSide,
    Irregular,
    WrongVertexCount,
    ZeroArea,
    TooSmall,
    LowSolidity,
    BadAspect,
    NonConvex,
}

/// An accepted polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidPolygon {
    pub shape: ShapeKind,
    /// Vertices in cyclic order.
    pub vertices: Vec<Point2<f64>>,
    /// Truncated integer pixel centroid.
    pub centroid: (i32, i32),
}

/// `true` when side lengths agree within `tolerance` of the longest side.
pub fn sides_are_regular(sides: &[f64], tolerance: f64) -> bool {
    let (min, max) = sides
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });
    !sides.is_empty() && (max - min) < tolerance * max
}

/// Sort segments by the polar angle of their midpoints around the mean
/// midpoint.
pub fn order_by_midpoint_angle(segments: &mut [LineSegment]) {
    if segments.is_empty() {
        return;
    }
    let n = segments.len() as f64;
    let (sx, sy) = segments.iter().fold((0.0, 0.0), |(sx, sy), s| {
        let m = s.midpoint();
        (sx + m.x, sy + m.y)
    });
    let (cx, cy) = (sx / n, sy / n);
    let angle = |s: &LineSegment| {
        let m = s.midpoint();
        (m.y - cy).atan2(m.x - cx)
    };
    segments.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
}

/// Validator for one target shape.
#[derive(Clone, Debug)]
pub struct PolygonValidator {
    shape: ShapeKind,
    params: LineValidatorParams,
}

impl PolygonValidator {
    pub fn new(shape: ShapeKind, params: LineValidatorParams) -> Self {
        Self { shape, params }
    }

    pub fn for_shape(shape: ShapeKind) -> Self {
        Self::new(shape, LineValidatorParams::for_shape(shape))
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn params(&self) -> &LineValidatorParams {
        &self.params
    }

    /// Run every check on one candidate.
    pub fn evaluate(&self, candidate: &[LineSegment]) -> Result<ValidPolygon, Rejection> {
        let k = self.shape.vertex_count();
        if candidate.len() != k {
            return Err(Rejection::WrongSegmentCount);
        }
        let mut segs = candidate.to_vec();
        if self.params.order_cyclically {
            order_by_midpoint_angle(&mut segs);
        }

        let prox = self.params.endpoint_proximity_px;
        let proximate = match self.params.proximity {
            ProximityRule::AllPairs => (0..k)
                .all(|i| ((i + 1)..k).all(|j| segs[i].is_near(&segs[j], prox))),
            ProximityRule::CyclicNeighbors => {
                (0..k).all(|i| segs[i].is_near(&segs[(i + 1) % k], prox))
            }
        };
        if !proximate {
            return Err(Rejection::NotProximate);
        }

        let vertices = (0..k)
            .map(|i| line_intersection(&segs[i], &segs[(i + 1) % k]))
            .collect::<Option<Vec<_>>>()
            .ok_or(Rejection::Parallel)?;

        for i in 0..k {
            for j in (i + 1)..k {
                if nalgebra::distance(&vertices[i], &vertices[j]) < VERTEX_EPS {
                    return Err(Rejection::CoincidentVertices);
                }
            }
        }

        let sides = side_lengths(&vertices);
        if sides.iter().any(|&s| s <= self.params.min_side_px) {
            return Err(Rejection::DegenerateSide);
        }
        if !sides_are_regular(&sides, self.params.tolerance) {
            return Err(Rejection::Irregular);
        }

        let centre = match self.params.centroid {
            CentroidMode::Vertices => mean(vertices.iter().copied()),
            CentroidMode::SegmentMidpoints => mean(segs.iter().map(|s| s.midpoint())),
        };
        Ok(ValidPolygon {
            shape: self.shape,
            vertices,
            centroid: (centre.x as i32, centre.y as i32),
        })
    }

    /// `Some` if the candidate passes every check.
    pub fn validate(&self, candidate: &[LineSegment]) -> Option<ValidPolygon> {
        self.evaluate(candidate).ok()
    }

    /// Search all bounded candidates drawn from `segments`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, segments), fields(shape = %self.shape, segments = segments.len()))
    )]
    pub fn find_all(&self, segments: &[LineSegment]) -> Vec<ValidPolygon> {
        let k = self.shape.vertex_count();
        let pool = longest(segments, self.params.max_lines);
        if pool.len() < k {
            return Vec::new();
        }

        let search = CandidateSearch::new(
            &pool,
            k,
            self.params.endpoint_proximity_px,
            self.params.proximity,
            self.params.max_candidates,
        );
        let mut found = Vec::new();
        let mut candidate = Vec::with_capacity(k);
        let stats: SearchStats = search.run(|idx| {
            candidate.clear();
            candidate.extend(idx.iter().map(|&i| pool[i]));
            if let Ok(poly) = self.evaluate(&candidate) {
                found.push(poly);
            }
        });
        debug!(
            "{}: {} segments, {} components, {} candidates, {} accepted",
            self.shape,
            pool.len(),
            stats.components,
            stats.evaluated,
            found.len()
        );
        found
    }
}

fn longest(segments: &[LineSegment], max_lines: usize) -> Vec<LineSegment> {
    let mut pool = segments.to_vec();
    if pool.len() > max_lines {
        pool.sort_by(|a, b| b.length().total_cmp(&a.length()));
        pool.truncate(max_lines);
    }
    pool
}

fn mean(points: impl Iterator<Item = Point2<f64>>) -> Point2<f64> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        sx += p.x;
        sy += p.y;
        n += 1;
    }
    let n = n.max(1) as f64;
    Point2::new(sx / n, sy / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_sides() -> [LineSegment; 3] {
        // Near-equilateral: A(100,200) B(300,200) C(200,27).
        [
            LineSegment::new(100, 200, 300, 200),
            LineSegment::new(300, 200, 200, 27),
            LineSegment::new(200, 27, 100, 200),
        ]
    }

    fn hexagon_sides() -> Vec<LineSegment> {
        let v = [
            (360, 300),
            (330, 352),
            (270, 352),
            (240, 300),
            (270, 248),
            (330, 248),
        ];
        (0..6)
            .map(|i| {
                let (a, b) = (v[i], v[(i + 1) % 6]);
                LineSegment::new(a.0, a.1, b.0, b.1)
            })
            .collect()
    }

    #[test]
    fn equilateral_triangle_is_accepted_with_vertex_mean_centroid() {
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        let poly = v.evaluate(&triangle_sides()).expect("valid triangle");
        assert_eq!(poly.vertices.len(), 3);
        let mx = poly.vertices.iter().map(|p| p.x).sum::<f64>() / 3.0;
        let my = poly.vertices.iter().map(|p| p.y).sum::<f64>() / 3.0;
        assert_eq!(poly.centroid, (mx as i32, my as i32));
        assert_eq!(poly.centroid, (200, 142));
    }

    #[test]
    fn input_order_does_not_matter_when_ordering_cyclically() {
        let v = PolygonValidator::for_shape(ShapeKind::Hexagon);
        let mut sides = hexagon_sides();
        sides.swap(0, 3);
        sides.swap(1, 4);
        let poly = v.evaluate(&sides).expect("valid hexagon");
        assert_eq!(poly.centroid, (300, 300));

        let mut params = LineValidatorParams::for_shape(ShapeKind::Hexagon);
        params.order_cyclically = false;
        let strict = PolygonValidator::new(ShapeKind::Hexagon, params);
        assert!(strict.evaluate(&sides).is_err());
        assert!(strict.evaluate(&hexagon_sides()).is_ok());
    }

    #[test]
    fn parallel_pair_is_rejected() {
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        let cand = [
            LineSegment::new(0, 0, 100, 0),
            LineSegment::new(0, 20, 100, 20),
            LineSegment::new(100, 0, 100, 20),
        ];
        assert_eq!(v.evaluate(&cand), Err(Rejection::Parallel));
    }

    #[test]
    fn concurrent_lines_collapse_to_one_vertex() {
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        let fan = [
            LineSegment::new(100, 100, 200, 100),
            LineSegment::new(100, 100, 100, 200),
            LineSegment::new(100, 100, 200, 200),
        ];
        assert_eq!(v.evaluate(&fan), Err(Rejection::CoincidentVertices));
        assert!(v.find_all(&fan).is_empty());
    }

    #[test]
    fn tolerance_boundary_is_strict() {
        assert!(!sides_are_regular(&[8.0, 4.0, 6.0], 0.5));
        assert!(sides_are_regular(&[8.0, 4.01, 6.0], 0.5));
        assert!(!sides_are_regular(&[], 0.5));

        // 3-4-5 right triangle scaled by 20: (100 - 60) == 0.4 * 100.
        let right = [
            LineSegment::new(100, 100, 180, 100),
            LineSegment::new(180, 100, 100, 160),
            LineSegment::new(100, 160, 100, 100),
        ];
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        assert_eq!(v.evaluate(&right), Err(Rejection::Irregular));

        let mut params = LineValidatorParams::for_shape(ShapeKind::Triangle);
        params.tolerance = 0.41;
        let loose = PolygonValidator::new(ShapeKind::Triangle, params);
        assert!(loose.evaluate(&right).is_ok());
    }

    #[test]
    fn regular_hexagon_accepted_and_stray_segment_rejected() {
        let v = PolygonValidator::for_shape(ShapeKind::Hexagon);
        let sides = hexagon_sides();
        let poly = v.evaluate(&sides).expect("valid hexagon");
        assert_eq!(poly.vertices.len(), 6);

        let mut broken = sides.clone();
        broken[2] = LineSegment::new(500, 500, 560, 500);
        assert_eq!(v.evaluate(&broken), Err(Rejection::NotProximate));

        let mut with_stray = sides;
        with_stray.push(LineSegment::new(500, 500, 560, 500));
        let found = v.find_all(&with_stray);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].centroid, (300, 300));
    }

    #[test]
    fn tiny_triangle_is_degenerate() {
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        let tiny = [
            LineSegment::new(0, 0, 8, 0),
            LineSegment::new(8, 0, 4, 7),
            LineSegment::new(4, 7, 0, 0),
        ];
        assert_eq!(v.evaluate(&tiny), Err(Rejection::DegenerateSide));
    }

    #[test]
    fn find_all_recovers_triangle_among_clutter() {
        let mut segs = triangle_sides().to_vec();
        segs.push(LineSegment::new(600, 600, 700, 650));
        segs.push(LineSegment::new(0, 400, 10, 500));
        let v = PolygonValidator::for_shape(ShapeKind::Triangle);
        let found = v.find_all(&segs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].centroid, (200, 142));
        assert!(v.find_all(&segs[..2]).is_empty());
    }

    #[test]
    fn midpoint_centroid_mode() {
        let mut params = LineValidatorParams::for_shape(ShapeKind::Triangle);
        params.centroid = CentroidMode::SegmentMidpoints;
        let v = PolygonValidator::new(ShapeKind::Triangle, params);
        let poly = v.evaluate(&triangle_sides()).expect("valid");
        // Midpoints (200,200), (250,113.5), (150,113.5).
        assert_eq!(poly.centroid, (200, 142));
    }
}
