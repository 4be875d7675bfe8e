use std::collections::BTreeMap;

use geomarker_core::{ColorBand, ConfigError, Detection, LineSegment};
use image::{GrayImage, RgbImage};
use log::debug;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::color::ColorSegmenter;
use crate::contour::ContourValidator;
use crate::edges::{approximate_contour, contour_source, extract_segments};
use crate::params::{ShapeDetectorParams, Strategy, TargetSpec};
use crate::validate::{PolygonValidator, ValidPolygon};

/// Per-color intermediate products shared by all targets of that color.
enum Extracted {
    Lines(Vec<LineSegment>),
    Contours(Vec<Vec<imageproc::point::Point<i32>>>),
}

/// Frame-to-detections pipeline for a fixed set of targets.
///
/// Holds no per-frame state; one instance can serve many threads.
#[derive(Clone, Debug)]
pub struct ShapeDetector {
    params: ShapeDetectorParams,
    segmenter: ColorSegmenter,
}

impl ShapeDetector {
    /// Validate `params` and build the color segmenter.
    pub fn new(params: ShapeDetectorParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let segmenter = ColorSegmenter::new(params.color.clone())?;
        Ok(Self { params, segmenter })
    }

    pub fn params(&self) -> &ShapeDetectorParams {
        &self.params
    }

    pub fn segmenter(&self) -> &ColorSegmenter {
        &self.segmenter
    }

    /// Detect every configured target in `frame`.
    ///
    /// An empty result means nothing was found; it is never an error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &RgbImage) -> Vec<Detection> {
        let mut per_color: BTreeMap<ColorBand, Extracted> = BTreeMap::new();
        let mut out = Vec::new();
        for target in &self.params.targets {
            let extracted = per_color
                .entry(target.color)
                .or_insert_with(|| self.extract(frame, target.color));
            out.extend(self.validate_target(*target, extracted));
        }
        debug!("{} detections before merging", out.len());
        match self.params.merge_radius_px {
            Some(radius) => merge_detections(out, radius),
            None => out,
        }
    }

    /// Detect a single target, regardless of the configured target list.
    pub fn detect_target(&self, frame: &RgbImage, target: TargetSpec) -> Vec<Detection> {
        let extracted = self.extract(frame, target.color);
        let found = self.validate_target(target, &extracted);
        match self.params.merge_radius_px {
            Some(radius) => merge_detections(found, radius),
            None => found,
        }
    }

    /// Binary mask for one color band.
    pub fn mask(&self, frame: &RgbImage, color: ColorBand) -> GrayImage {
        self.segmenter.segment(frame, color)
    }

    fn extract(&self, frame: &RgbImage, color: ColorBand) -> Extracted {
        let mask = self.mask(frame, color);
        match self.params.strategy {
            Strategy::Lines => {
                let segments = extract_segments(frame, &mask, &self.params.line_extraction);
                debug!("{color}: {} line segments", segments.len());
                Extracted::Lines(segments)
            }
            Strategy::Contours => {
                let contours = contour_source(&mask, &self.params.contour_extraction);
                debug!("{color}: {} external contours", contours.len());
                Extracted::Contours(contours)
            }
        }
    }

    fn validate_target(&self, target: TargetSpec, extracted: &Extracted) -> Vec<Detection> {
        let shape_params = self.params.shape_params(target.shape);
        let polygons: Vec<ValidPolygon> = match extracted {
            Extracted::Lines(segments) => {
                PolygonValidator::new(target.shape, shape_params.lines.clone()).find_all(segments)
            }
            Extracted::Contours(contours) => {
                let factor = shape_params.contours.epsilon_factor;
                let approx: Vec<_> = contours
                    .iter()
                    .map(|c| approximate_contour(c, factor))
                    .collect();
                ContourValidator::new(target.shape, shape_params.contours.clone()).find_all(&approx)
            }
        };
        debug!("{target}: {} accepted polygons", polygons.len());
        polygons
            .into_iter()
            .map(|p| Detection::new(target.shape, target.color, p.centroid))
            .collect()
    }
}

/// Collapse same-kind detections whose centroids lie within `radius` of a
/// cluster member into one detection at the cluster mean.
///
/// Output order follows the first member of each cluster.
pub fn merge_detections(detections: Vec<Detection>, radius: f64) -> Vec<Detection> {
    let n = detections.len();
    let r2 = radius * radius;
    let mut cluster: Vec<Option<usize>> = vec![None; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for seed in 0..n {
        if cluster[seed].is_some() {
            continue;
        }
        let id = clusters.len();
        cluster[seed] = Some(id);
        let mut members = vec![seed];
        let mut head = 0;
        while head < members.len() {
            let a = detections[members[head]];
            head += 1;
            for j in 0..n {
                if cluster[j].is_some() {
                    continue;
                }
                let b = detections[j];
                if a.shape != b.shape || a.color != b.color {
                    continue;
                }
                let dx = (a.x() - b.x()) as f64;
                let dy = (a.y() - b.y()) as f64;
                if dx * dx + dy * dy <= r2 {
                    cluster[j] = Some(id);
                    members.push(j);
                }
            }
        }
        clusters.push(members);
    }

    clusters
        .into_iter()
        .map(|members| {
            let first = detections[members[0]];
            let count = members.len() as f64;
            let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &i| {
                (sx + detections[i].x() as f64, sy + detections[i].y() as f64)
            });
            Detection::new(
                first.shape,
                first.color,
                ((sx / count) as i32, (sy / count) as i32),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomarker_core::ShapeKind;
    use image::Rgb;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    fn frame_with_triangle() -> RgbImage {
        let mut frame = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
        draw_polygon_mut(
            &mut frame,
            &[Point::new(160, 40), Point::new(230, 161), Point::new(90, 161)],
            Rgb([230, 20, 20]),
        );
        frame
    }

    #[test]
    fn merges_nearby_duplicates_only() {
        let t = |x, y| Detection::new(ShapeKind::Triangle, ColorBand::Red, (x, y));
        let h = Detection::new(ShapeKind::Hexagon, ColorBand::Blue, (101, 100));
        let merged = merge_detections(vec![t(100, 100), t(104, 100), h, t(200, 200)], 10.0);
        assert_eq!(merged, vec![t(102, 100), h, t(200, 200)]);
        assert!(merge_detections(Vec::new(), 10.0).is_empty());
    }

    #[test]
    fn empty_frame_yields_no_detections() {
        let frame = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        for strategy in [Strategy::Lines, Strategy::Contours] {
            let det = ShapeDetector::new(ShapeDetectorParams::default().with_strategy(strategy))
                .expect("valid params");
            assert!(det.detect(&frame).is_empty());
        }
    }

    #[test]
    fn contour_strategy_finds_red_triangle() {
        let det = ShapeDetector::new(
            ShapeDetectorParams::default().with_strategy(Strategy::Contours),
        )
        .expect("valid params");
        let found = det.detect(&frame_with_triangle());
        assert_eq!(found.len(), 1, "{found:?}");
        assert_eq!(found[0].shape, ShapeKind::Triangle);
        assert_eq!(found[0].color, ColorBand::Red);
        // Area centroid of the drawn triangle is (160, 120.7).
        assert!((found[0].x() - 160).abs() <= 3, "{found:?}");
        assert!((found[0].y() - 120).abs() <= 3, "{found:?}");
    }

    #[test]
    fn line_strategy_finds_red_triangle() {
        let det = ShapeDetector::new(ShapeDetectorParams::default()).expect("valid params");
        let found = det.detect_target(
            &frame_with_triangle(),
            TargetSpec::new(ShapeKind::Triangle, ColorBand::Red),
        );
        assert!(
            found
                .iter()
                .any(|d| (d.x() - 160).abs() <= 6 && (d.y() - 120).abs() <= 6),
            "{found:?}"
        );
    }
}
