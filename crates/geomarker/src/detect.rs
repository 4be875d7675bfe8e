use std::path::Path;
use std::sync::RwLock;

use geomarker_core::{ConfigError, Detection};
use geomarker_geo::{CameraError, CameraIntrinsics, GeoFix, GeoProjector, PlatformPose};
use geomarker_shapes::{ShapeDetector, ShapeDetectorParams};
use image::{ImageReader, RgbImage};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level helpers.
#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A detection with its ground position, if the pixel ray reaches the ground.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocatedDetection {
    pub detection: Detection,
    pub fix: Option<GeoFix>,
}

/// Load an image file as 8-bit RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, LocateError> {
    Ok(ImageReader::open(path)?.decode()?.to_rgb8())
}

/// Detector plus camera model: frame + pose -> located detections.
///
/// Intrinsics are rebuilt only when the frame size changes.
#[derive(Debug)]
pub struct MarkerLocator {
    detector: ShapeDetector,
    projector: GeoProjector,
    hfov_deg: f64,
    intrinsics: RwLock<Option<CameraIntrinsics>>,
}

impl MarkerLocator {
    pub fn new(params: ShapeDetectorParams, hfov_deg: f64) -> Result<Self, LocateError> {
        // Surface FOV problems at construction rather than on the first frame.
        CameraIntrinsics::from_fov(1, 1, hfov_deg)?;
        Ok(Self {
            detector: ShapeDetector::new(params)?,
            projector: GeoProjector::default(),
            hfov_deg,
            intrinsics: RwLock::new(None),
        })
    }

    pub fn with_projector(mut self, projector: GeoProjector) -> Self {
        self.projector = projector;
        self
    }

    pub fn detector(&self) -> &ShapeDetector {
        &self.detector
    }

    pub fn hfov_deg(&self) -> f64 {
        self.hfov_deg
    }

    /// Intrinsics for a `width x height` frame, reusing the cached ones when
    /// the size matches.
    pub fn intrinsics_for(&self, width: u32, height: u32) -> Result<CameraIntrinsics, CameraError> {
        if let Ok(guard) = self.intrinsics.read() {
            if let Some(cached) = guard.as_ref() {
                if cached.matches(width, height, self.hfov_deg) {
                    return Ok(*cached);
                }
            }
        }
        let fresh = CameraIntrinsics::from_fov(width, height, self.hfov_deg)?;
        debug!(
            "camera intrinsics for {width}x{height}: fx={:.2} fy={:.2}",
            fresh.fx, fresh.fy
        );
        if let Ok(mut guard) = self.intrinsics.write() {
            *guard = Some(fresh);
        }
        Ok(fresh)
    }

    /// Geolocate an already detected marker.
    pub fn geolocate(
        &self,
        camera: &CameraIntrinsics,
        detection: &Detection,
        pose: &PlatformPose,
    ) -> Option<GeoFix> {
        let pixel = Point2::new(detection.x() as f64, detection.y() as f64);
        self.projector.locate_pixel(camera, pixel, pose)
    }

    /// Detect all configured markers in `frame` and geolocate them.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame, pose), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn locate(
        &self,
        frame: &RgbImage,
        pose: &PlatformPose,
    ) -> Result<Vec<LocatedDetection>, LocateError> {
        let camera = self.intrinsics_for(frame.width(), frame.height())?;
        let located = self
            .detector
            .detect(frame)
            .into_iter()
            .map(|detection| LocatedDetection {
                fix: self.geolocate(&camera, &detection, pose),
                detection,
            })
            .collect::<Vec<_>>();
        debug!(
            "{} markers, {} with a ground fix",
            located.len(),
            located.iter().filter(|l| l.fix.is_some()).count()
        );
        Ok(located)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geomarker_core::{ColorBand, ShapeKind};

    #[test]
    fn rejects_invalid_fov_up_front() {
        let err = MarkerLocator::new(ShapeDetectorParams::default(), 0.0).unwrap_err();
        assert!(matches!(err, LocateError::Camera(CameraError::InvalidFov(_))));
    }

    #[test]
    fn caches_intrinsics_per_size() {
        let locator = MarkerLocator::new(ShapeDetectorParams::default(), 78.0).expect("valid");
        let a = locator.intrinsics_for(1280, 720).expect("valid");
        let b = locator.intrinsics_for(1280, 720).expect("valid");
        assert_eq!(a, b);
        let c = locator.intrinsics_for(640, 480).expect("valid");
        assert_eq!((c.width, c.height), (640, 480));
        assert!(locator.intrinsics_for(0, 480).is_err());
    }

    #[test]
    fn centre_detection_lands_on_platform() {
        let locator = MarkerLocator::new(ShapeDetectorParams::default(), 78.0).expect("valid");
        let camera = locator.intrinsics_for(1280, 720).expect("valid");
        let det = Detection::new(ShapeKind::Triangle, ColorBand::Red, (640, 360));
        let pose = PlatformPose::nadir(41.0082, 28.9784, 78.0);
        let fix = locator.geolocate(&camera, &det, &pose).expect("nadir");
        assert_abs_diff_eq!(fix.latitude, 41.0082, epsilon = 1e-12);
        assert_abs_diff_eq!(fix.longitude, 28.9784, epsilon = 1e-12);
    }
}
