//! Colored triangle / hexagon detection.
//!
//! Pipeline per color band:
//! 1. [`ColorSegmenter`]: RGB frame -> HSV in-range mask, opened then closed.
//! 2. Edge extraction ([`edges`]): either Canny + probabilistic Hough line
//!    segments, or external contours approximated to polygons.
//! 3. Validation: [`PolygonValidator`] searches bounded segment subsets for
//!    regular k-gons; [`ContourValidator`] filters approximated contours.
//! 4. [`ShapeDetector`] ties the stages together and merges duplicates.
//!
//! ```no_run
//! use geomarker_shapes::{ShapeDetector, ShapeDetectorParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = image::open("frame.png")?.to_rgb8();
//! let detector = ShapeDetector::new(ShapeDetectorParams::default())?;
//! for det in detector.detect(&frame) {
//!     println!("{} {} at {:?}", det.color, det.shape, det.pixel_centroid);
//! }
//! # Ok(())
//! # }
//! ```

pub mod color;
mod combos;
mod contour;
mod detector;
pub mod edges;
pub mod hough;
mod params;
mod validate;

pub use color::{rgb_to_hsv, ColorParams, ColorRanges, ColorSegmenter, HsvRange};
pub use combos::{CandidateSearch, SearchStats};
pub use contour::{ContourValidator, ContourValidatorParams};
pub use detector::{merge_detections, ShapeDetector};
pub use edges::{
    ApproxPolygon, CannyParams, ContourExtractionParams, ContourInput, EdgeInput,
    LineExtractionParams,
};
pub use hough::{hough_lines_p, HoughParams};
pub use params::{ShapeDetectorParams, ShapeParams, Strategy, TargetSpec};
pub use validate::{
    order_by_midpoint_angle, sides_are_regular, CentroidMode, LineValidatorParams,
    PolygonValidator, ProximityRule, Rejection, ValidPolygon,
};
