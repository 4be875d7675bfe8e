//! Core value types and planar geometry for colored-marker detection.
//!
//! This crate is small and purely geometric. It knows nothing about image
//! buffers, color spaces or camera models; those live in
//! `geomarker-shapes` and `geomarker-geo`.

mod error;
mod logger;
mod polygon;
mod segment;
mod types;

pub use error::ConfigError;
pub use polygon::{
    bounding_box, convex_hull, is_convex, perimeter, polygon_area, polygon_centroid,
    side_lengths, signed_area, BoundingBox,
};
pub use segment::{line_intersection, LineSegment};
pub use types::{ColorBand, Detection, ShapeKind};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
