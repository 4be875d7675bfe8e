//! Colored-marker detection and geolocation.
//!
//! This facade crate provides:
//! - re-exports of the `geomarker-*` building blocks
//! - [`MarkerLocator`]: detect markers in a frame and geolocate each one
//! - JSON job configuration and reports ([`io`])
//! - result sinks for per-detection records ([`sink`])
//! - overlay drawing for visual inspection ([`overlay`])
//!
//! ## Quickstart
//!
//! ```no_run
//! use geomarker::{MarkerLocator, PlatformPose, ShapeDetectorParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = geomarker::load_rgb("frame.png")?;
//! let locator = MarkerLocator::new(ShapeDetectorParams::default(), 78.0)?;
//! let pose = PlatformPose::nadir(41.0082, 28.9784, 78.0);
//! for hit in locator.locate(&frame, &pose)? {
//!     println!("{:?} -> {:?}", hit.detection, hit.fix);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `geomarker::core`: value types, segment/polygon geometry, logger.
//! - `geomarker::shapes`: color segmentation, Hough/contour extraction,
//!   polygon validation, [`ShapeDetector`].
//! - `geomarker::geo`: camera intrinsics, platform pose, ground projection.

pub use geomarker_core as core;
pub use geomarker_geo as geo;
pub use geomarker_shapes as shapes;

pub use geomarker_core::{ColorBand, ConfigError, Detection, LineSegment, ShapeKind};
pub use geomarker_geo::{CameraIntrinsics, GeoFix, GeoProjector, PlatformPose};
pub use geomarker_shapes::{ShapeDetector, ShapeDetectorParams, Strategy, TargetSpec};

mod detect;
pub mod io;
pub mod overlay;
pub mod sink;

pub use detect::{load_rgb, LocateError, LocatedDetection, MarkerLocator};
