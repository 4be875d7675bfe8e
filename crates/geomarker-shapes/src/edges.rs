//! Edge and contour extraction from a color mask.
//!
//! Two independent front ends feed the validators:
//! - line based: blur, Canny, probabilistic Hough -> [`LineSegment`]s;
//! - contour based: external contours -> Douglas-Peucker polygons.

use geomarker_core::{ConfigError, LineSegment};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::hough::{hough_lines_p, HoughParams};

/// Which image the Canny stage sees in the line-based strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeInput {
    /// The binary color mask.
    Mask,
    /// The grayscale frame with everything outside the mask zeroed.
    MaskedFrame,
}

/// Which binary image contours are traced on in the contour strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourInput {
    Mask,
    Edges,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyParams {
    pub low: f32,
    pub high: f32,
    /// Gaussian pre-blur sigma; `None` skips the blur.
    pub blur_sigma: Option<f32>,
    /// Equalize the histogram before edge detection.
    pub equalize: bool,
}

impl Default for CannyParams {
    fn default() -> Self {
        Self {
            low: 50.0,
            high: 150.0,
            blur_sigma: Some(1.1),
            equalize: false,
        }
    }
}

impl CannyParams {
    /// Thresholds must satisfy `0 <= low <= high`; the blur sigma, if any,
    /// must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.low >= 0.0 && self.low <= self.high) {
            return Err(ConfigError::invalid_parameter(
                "canny",
                format!("need 0 <= low <= high, got {} / {}", self.low, self.high),
            ));
        }
        if let Some(sigma) = self.blur_sigma {
            if !(sigma > 0.0) {
                return Err(ConfigError::invalid_parameter(
                    "canny.blur_sigma",
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineExtractionParams {
    pub input: EdgeInput,
    pub canny: CannyParams,
    pub hough: HoughParams,
}

impl Default for LineExtractionParams {
    fn default() -> Self {
        Self {
            input: EdgeInput::Mask,
            canny: CannyParams::default(),
            hough: HoughParams::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourExtractionParams {
    pub input: ContourInput,
    /// Used only with [`ContourInput::Edges`].
    pub canny: CannyParams,
}

impl Default for ContourExtractionParams {
    fn default() -> Self {
        Self {
            input: ContourInput::Mask,
            canny: CannyParams::default(),
        }
    }
}

/// A traced contour together with its polygon approximation.
#[derive(Clone, Debug, PartialEq)]
pub struct ApproxPolygon {
    pub contour: Vec<Point2<f64>>,
    pub vertices: Vec<Point2<f64>>,
}

/// Grayscale frame with pixels outside `mask` set to zero.
pub fn masked_gray(frame: &RgbImage, mask: &GrayImage) -> GrayImage {
    let gray = image::imageops::grayscale(frame);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if mask.get_pixel(x, y)[0] != 0 {
            *gray.get_pixel(x, y)
        } else {
            Luma([0])
        }
    })
}

/// Binary Canny edge map (`0`/`255`).
pub fn canny_edges(gray: &GrayImage, params: &CannyParams) -> GrayImage {
    let mut img = match params.blur_sigma {
        Some(sigma) => imageproc::filter::gaussian_blur_f32(gray, sigma),
        None => gray.clone(),
    };
    if params.equalize {
        img = imageproc::contrast::equalize_histogram(&img);
    }
    imageproc::edges::canny(&img, params.low, params.high)
}

/// Line segments of the mask outline.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame, mask, params), fields(width = mask.width(), height = mask.height()))
)]
pub fn extract_segments(
    frame: &RgbImage,
    mask: &GrayImage,
    params: &LineExtractionParams,
) -> Vec<LineSegment> {
    let edges = match params.input {
        EdgeInput::Mask => canny_edges(mask, &params.canny),
        EdgeInput::MaskedFrame => canny_edges(&masked_gray(frame, mask), &params.canny),
    };
    hough_lines_p(&edges, &params.hough)
}

/// Outer contours without a parent, as integer pixel chains.
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| c.points.len() >= 3)
        .map(|c| c.points)
        .collect()
}

/// Contours to approximate, traced on the image the parameters ask for.
pub fn contour_source(mask: &GrayImage, params: &ContourExtractionParams) -> Vec<Vec<Point<i32>>> {
    match params.input {
        ContourInput::Mask => external_contours(mask),
        ContourInput::Edges => external_contours(&canny_edges(mask, &params.canny)),
    }
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The contour is split at two mutually distant points so that each half is
/// an open chain with distinct endpoints; both halves are simplified and
/// joined.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || !(epsilon > 0.0) {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if points[a] == points[b] {
        return vec![points[a]];
    }
    let (i, j) = (a.min(b), a.max(b));

    let first = &points[i..=j];
    let second: Vec<Point<i32>> = points[j..].iter().chain(&points[..=i]).copied().collect();

    let mut out = approximate_polygon_dp(first, epsilon, false);
    out.pop();
    let tail = approximate_polygon_dp(&second, epsilon, false);
    out.extend_from_slice(&tail[..tail.len().saturating_sub(1)]);
    out
}

/// Approximate a contour with `epsilon = epsilon_factor * perimeter`.
pub fn approximate_contour(contour: &[Point<i32>], epsilon_factor: f64) -> ApproxPolygon {
    let epsilon = epsilon_factor * arc_length(contour, true);
    let vertices = approximate_closed(contour, epsilon);
    ApproxPolygon {
        contour: contour.iter().map(to_point2).collect(),
        vertices: vertices.iter().map(to_point2).collect(),
    }
}

fn farthest_from(points: &[Point<i32>], from: Point<i32>) -> usize {
    let mut best = (0usize, -1i64);
    for (i, p) in points.iter().enumerate() {
        let (dx, dy) = ((p.x - from.x) as i64, (p.y - from.y) as i64);
        let d = dx * dx + dy * dy;
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}

fn to_point2(p: &Point<i32>) -> Point2<f64> {
    Point2::new(p.x as f64, p.y as f64)
}
