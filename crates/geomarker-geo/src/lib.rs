//! Pixel to ground geolocation.
//!
//! A pixel is turned into a camera-frame ray with [`CameraIntrinsics`],
//! rotated into a local East-South-Down frame by the platform attitude in
//! [`PlatformPose`], intersected with a flat ground plane and finally
//! converted into a latitude/longitude offset by [`GeoProjector`].
//!
//! ```
//! use geomarker_geo::{CameraIntrinsics, GeoProjector, PlatformPose};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = CameraIntrinsics::from_fov(1280, 720, 78.0)?;
//! let pose = PlatformPose::nadir(41.0082, 28.9784, 78.0);
//! let fix = GeoProjector::default()
//!     .locate_pixel(&camera, Point2::new(640.0, 360.0), &pose)
//!     .expect("nadir ray hits the ground");
//! assert!((fix.latitude - 41.0082).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

mod intrinsics;
mod pose;
mod projector;

pub use intrinsics::{CameraError, CameraIntrinsics};
pub use pose::PlatformPose;
pub use projector::{GeoFix, GeoProjector, EARTH_RADIUS_M, MIN_DOWN_COMPONENT};
