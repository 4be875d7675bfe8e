use log::trace;
use nalgebra::{Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CameraIntrinsics, PlatformPose};

/// WGS-84 equatorial radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Rays whose world-frame down component is not above this are treated as
/// level or pointing at the sky.
///
/// Slightly above zero: a ray rotated exactly to the horizon keeps a
/// rounding residue around `1e-17`, which would otherwise intersect the
/// ground tens of thousands of kilometres away.
pub const MIN_DOWN_COMPONENT: f64 = 1e-9;

/// Geodetic position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Flat-ground, locally-flat-earth geolocation.
///
/// Offsets are converted to degrees with a spherical small-offset
/// approximation, adequate for ranges of a few hundred metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoProjector {
    pub earth_radius_m: f64,
}

impl Default for GeoProjector {
    fn default() -> Self {
        Self {
            earth_radius_m: EARTH_RADIUS_M,
        }
    }
}

impl GeoProjector {
    /// Ground offset `(east, north)` in metres of a camera-frame ray.
    ///
    /// Returns `None` unless the world-frame down component of the ray
    /// exceeds [`MIN_DOWN_COMPONENT`].
    pub fn ground_offset(&self, ray_cam: &Vector3<f64>, pose: &PlatformPose) -> Option<Vector2<f64>> {
        let ray_world = pose.rotation() * ray_cam;
        if ray_world.z <= MIN_DOWN_COMPONENT {
            trace!("ray {ray_world:?} does not reach the ground");
            return None;
        }
        let ground = ray_world * (pose.height_above_ground / ray_world.z);
        Some(Vector2::new(ground.x, -ground.y))
    }

    /// Geolocate a camera-frame ray.
    pub fn project_ray(&self, ray_cam: &Vector3<f64>, pose: &PlatformPose) -> Option<GeoFix> {
        let offset = self.ground_offset(ray_cam, pose)?;
        Some(self.offset_to_fix(pose.latitude, pose.longitude, offset.x, offset.y))
    }

    /// Geolocate a pixel seen by `camera` from `pose`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, camera, pose), fields(x = pixel.x, y = pixel.y))
    )]
    pub fn locate_pixel(
        &self,
        camera: &CameraIntrinsics,
        pixel: Point2<f64>,
        pose: &PlatformPose,
    ) -> Option<GeoFix> {
        let ray = camera.pixel_to_ray(pixel);
        self.project_ray(&ray, pose)
    }

    /// Apply an `(east, north)` metre offset to a reference position.
    pub fn offset_to_fix(&self, latitude: f64, longitude: f64, east: f64, north: f64) -> GeoFix {
        let dlat = (north / self.earth_radius_m).to_degrees();
        let dlon = (east / (self.earth_radius_m * latitude.to_radians().cos())).to_degrees();
        GeoFix {
            latitude: latitude + dlat,
            longitude: longitude + dlon,
        }
    }

    /// Inverse of [`GeoProjector::offset_to_fix`]: `(east, north)` metres of
    /// `fix` relative to the reference position.
    pub fn fix_to_offset(&self, latitude: f64, longitude: f64, fix: &GeoFix) -> Vector2<f64> {
        let north = (fix.latitude - latitude).to_radians() * self.earth_radius_m;
        let east = (fix.longitude - longitude).to_radians()
            * self.earth_radius_m
            * latitude.to_radians().cos();
        Vector2::new(east, north)
    }
}
