//! Contour-based polygon validation.

use geomarker_core::{
    bounding_box, convex_hull, is_convex, polygon_area, polygon_centroid, ShapeKind,
};
use serde::{Deserialize, Serialize};

use crate::edges::ApproxPolygon;
use crate::validate::{Rejection, ValidPolygon};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourValidatorParams {
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub epsilon_factor: f64,
    /// Contour area must exceed this (px^2).
    pub min_area: f64,
    /// Minimum contour area over convex-hull area.
    pub min_solidity: f64,
    /// Bounding-box `w/h` must lie in `[1/max_aspect, max_aspect]`.
    pub max_aspect: f64,
}

impl ContourValidatorParams {
    pub fn for_shape(shape: ShapeKind) -> Self {
        let (epsilon_factor, min_area) = match shape {
            ShapeKind::Triangle => (0.04, 100.0),
            ShapeKind::Hexagon => (0.03, 150.0),
        };
        Self {
            epsilon_factor,
            min_area,
            min_solidity: 0.9,
            max_aspect: 1.6,
        }
    }
}

/// Accepts approximated contours of the target shape.
#[derive(Clone, Debug)]
pub struct ContourValidator {
    shape: ShapeKind,
    params: ContourValidatorParams,
}

impl ContourValidator {
    pub fn new(shape: ShapeKind, params: ContourValidatorParams) -> Self {
        Self { shape, params }
    }

    pub fn for_shape(shape: ShapeKind) -> Self {
        Self::new(shape, ContourValidatorParams::for_shape(shape))
    }

    pub fn params(&self) -> &ContourValidatorParams {
        &self.params
    }

    /// Accept `poly` or report the first failed check.
    pub fn evaluate(&self, poly: &ApproxPolygon) -> Result<ValidPolygon, Rejection> {
        if poly.vertices.len() != self.shape.vertex_count() {
            return Err(Rejection::WrongVertexCount);
        }

        let area = polygon_area(&poly.contour);
        if area <= self.params.min_area {
            return Err(Rejection::TooSmall);
        }

        let hull_area = polygon_area(&convex_hull(&poly.contour));
        if hull_area <= 0.0 || area / hull_area < self.params.min_solidity {
            return Err(Rejection::LowSolidity);
        }

        let bb = bounding_box(&poly.contour).ok_or(Rejection::ZeroArea)?;
        // Pixel extents, as for an integer bounding rectangle.
        let (w, h) = (bb.width() + 1.0, bb.height() + 1.0);
        let aspect = w / h;
        if aspect > self.params.max_aspect || aspect < 1.0 / self.params.max_aspect {
            return Err(Rejection::BadAspect);
        }

        if !is_convex(&poly.vertices) {
            return Err(Rejection::NonConvex);
        }

        let c = polygon_centroid(&poly.contour).ok_or(Rejection::ZeroArea)?;
        Ok(ValidPolygon {
            shape: self.shape,
            vertices: poly.vertices.clone(),
            centroid: (c.x as i32, c.y as i32),
        })
    }

    /// All accepted polygons, in input order.
    pub fn find_all(&self, polygons: &[ApproxPolygon]) -> Vec<ValidPolygon> {
        polygons
            .iter()
            .filter_map(|p| self.evaluate(p).ok())
            .collect()
    }
}
